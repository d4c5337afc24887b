//! SQLite-backed durable store for flushed log batches.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};

use crate::{record::LogRecord, types::Severity};

use super::{DurableStore, StoreError, StoreResult};

/// SQLite implementation of [`crate::persist::DurableStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a SQLite-backed store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Number of durable records.
    pub fn count(&self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl DurableStore for SqliteStore {
    fn write_batch(&mut self, records: &[LogRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO logs(content, server, severity, timestamp) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for rec in records {
                stmt.execute(params![
                    rec.content(),
                    rec.server(),
                    rec.severity().as_str(),
                    encode_timestamp(rec.timestamp()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> StoreResult<Vec<LogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT content, server, severity, timestamp FROM logs \
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let content: String = row.get(0)?;
            let server: String = row.get(1)?;
            let severity: String = row.get(2)?;
            let timestamp: String = row.get(3)?;
            Ok((content, server, severity, timestamp))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (content, server, severity, timestamp) = row?;
            out.push(decode_row(content, server, &severity, &timestamp)?);
        }
        Ok(out)
    }

    fn set_timeout(&mut self, timeout: Duration) -> StoreResult<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }
}

// Fixed-width UTC text so lexical order matches chronological order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_row(
    content: String,
    server: String,
    severity: &str,
    timestamp: &str,
) -> StoreResult<LogRecord> {
    let severity: Severity = severity
        .parse()
        .map_err(|err| StoreError::Corrupt(format!("{err}")))?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|err| StoreError::Corrupt(format!("timestamp {timestamp:?}: {err}")))?
        .with_timezone(&Utc);
    LogRecord::new(content, server, severity, timestamp)
        .map_err(|err| StoreError::Corrupt(format!("{err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(content: &str, secs: i64) -> LogRecord {
        LogRecord::new(
            content,
            "web-1",
            Severity::Warn,
            Utc.timestamp_opt(secs, 123).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn timestamps_encode_fixed_width() {
        let a = encode_timestamp(Utc.timestamp_opt(1, 0).unwrap());
        let b = encode_timestamp(Utc.timestamp_opt(1, 500_000_000).unwrap());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .write_batch(&[rec("a", 10), rec("b", 30), rec("c", 20)])
            .unwrap();

        let got = store.recent(2).unwrap();
        let contents: Vec<_> = got.iter().map(|r| r.content()).collect();
        assert_eq!(contents, vec!["b", "c"]);
        assert_eq!(got[0], rec("b", 30));
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.write_batch(&[]).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn storage_layer_rejects_unknown_severity() {
        let store = SqliteStore::open_in_memory().unwrap();
        let res = store.conn.execute(
            "INSERT INTO logs(content, server, severity, timestamp) VALUES ('a', 'b', 'CRITICAL', 't')",
            [],
        );
        assert!(res.is_err());
    }
}
