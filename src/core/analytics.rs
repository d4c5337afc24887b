use hashbrown::HashMap;

use crate::record::LogRecord;

/// Record count per originating server.
pub fn server_counts(records: &[LogRecord]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for rec in records {
        *counts.entry(rec.server().to_string()).or_insert(0) += 1;
    }
    counts
}
