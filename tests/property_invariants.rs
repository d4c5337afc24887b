use proptest::prelude::*;
use tempfile::TempDir;

use logbatch::{
    core::buffer::{FlushOutcome, IngestionBuffer},
    persist::{DurableStore, StoreError, StoreResult, recovery::RecoveryFile},
    record::{LogRecord, RawRecord},
};

#[derive(Default)]
struct FlakyStore {
    failing: bool,
    written: Vec<LogRecord>,
    batches: usize,
}

impl DurableStore for FlakyStore {
    fn write_batch(&mut self, records: &[LogRecord]) -> StoreResult<()> {
        if self.failing {
            return Err(StoreError::Message("store down".to_string()));
        }
        self.batches += 1;
        self.written.extend_from_slice(records);
        Ok(())
    }

    fn recent(&self, limit: usize) -> StoreResult<Vec<LogRecord>> {
        Ok(self.written.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone)]
enum Action {
    Valid { server: u8, severity: Option<u8> },
    EmptyContent,
    BadSeverity,
    StoreUp,
    StoreDown,
    OperatorFlush,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => (0u8..4, prop::option::of(0u8..3))
            .prop_map(|(server, severity)| Action::Valid { server, severity }),
        1 => Just(Action::EmptyContent),
        1 => Just(Action::BadSeverity),
        1 => Just(Action::StoreUp),
        1 => Just(Action::StoreDown),
        1 => Just(Action::OperatorFlush),
    ]
}

fn severity_name(idx: u8) -> &'static str {
    match idx {
        0 => "INFO",
        1 => "WARN",
        _ => "ERROR",
    }
}

proptest! {
    // Every accept fsyncs the recovery file; keep the case count modest.
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn recovery_file_mirrors_buffer_and_nothing_is_lost(
        threshold in 1usize..8,
        actions in prop::collection::vec(action_strategy(), 1..120),
    ) {
        let tmp = TempDir::new().expect("tmp");
        let file = RecoveryFile::new(tmp.path().join("buffer.json"));
        let mut buffer = IngestionBuffer::restore(file.clone(), threshold);
        let mut store = FlakyStore::default();
        let mut accepted = 0usize;
        let mut seq = 0usize;

        for action in actions {
            match action {
                Action::Valid { server, severity } => {
                    seq += 1;
                    let mut raw = RawRecord::new(format!("msg {seq}"), format!("server-{server}"));
                    if let Some(s) = severity {
                        raw = raw.with_severity(severity_name(s));
                    }
                    let before = buffer.len();
                    let ack = buffer.accept(raw, &mut store).expect("valid record");
                    accepted += 1;
                    if !store.failing {
                        prop_assert!(ack.pending < threshold);
                    }
                    match ack.flush {
                        FlushOutcome::Flushed { count } => {
                            prop_assert_eq!(count, before + 1);
                            prop_assert!(before + 1 >= threshold);
                            prop_assert_eq!(ack.pending, 0);
                        }
                        FlushOutcome::Deferred { .. } => {
                            prop_assert!(store.failing);
                            prop_assert_eq!(ack.pending, before + 1);
                        }
                        FlushOutcome::NotTriggered => {
                            prop_assert!(before + 1 < threshold);
                        }
                    }
                }
                Action::EmptyContent => {
                    let before = buffer.pending().to_vec();
                    prop_assert!(buffer.accept(RawRecord::new("", "s"), &mut store).is_err());
                    prop_assert_eq!(buffer.pending(), &before[..]);
                }
                Action::BadSeverity => {
                    let before = buffer.len();
                    let raw = RawRecord::new("x", "s").with_severity("CRITICAL");
                    prop_assert!(buffer.accept(raw, &mut store).is_err());
                    prop_assert_eq!(buffer.len(), before);
                }
                Action::StoreUp => store.failing = false,
                Action::StoreDown => store.failing = true,
                Action::OperatorFlush => {
                    let before = buffer.len();
                    match buffer.flush_pending(&mut store).written {
                        Ok(n) => {
                            prop_assert_eq!(n, before);
                            prop_assert!(buffer.is_empty());
                        }
                        Err(_) => prop_assert_eq!(buffer.len(), before),
                    }
                }
            }

            // The file exists once anything has been written; before that it mirrors an empty buffer.
            let on_disk = file.try_load().expect("load").unwrap_or_default();
            prop_assert_eq!(&on_disk[..], buffer.pending());
            prop_assert_eq!(store.written.len() + buffer.len(), accepted);
        }

        let mut arrival: Vec<_> = store.written.iter().map(|r| r.content().to_string()).collect();
        arrival.extend(buffer.pending().iter().map(|r| r.content().to_string()));
        let expected: Vec<_> = (1..=seq).map(|i| format!("msg {i}")).collect();
        prop_assert_eq!(arrival, expected);
    }
}
