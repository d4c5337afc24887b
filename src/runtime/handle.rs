use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    core::buffer::{Ack, FlushOutcome, IngestionBuffer},
    persist::{DurableStore, StoreError},
    record::{LogRecord, RawRecord, ValidationError},
    types::QUERY_LIMIT,
};

use super::events::IngestEvent;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("ingest runtime is not running")]
    ChannelClosed,
    #[error("blocking task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command_queue_bound: usize,
    pub event_capacity: usize,
    pub query_limit: usize,
    /// Upper bound on a single store call; `None` waits indefinitely.
    pub store_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
            query_limit: QUERY_LIMIT,
            store_timeout_ms: Some(5_000),
        }
    }
}

pub struct IngestHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<IngestEvent>,
}

impl Clone for IngestHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Accept {
        raw: RawRecord,
        resp: oneshot::Sender<Result<Ack, RuntimeError>>,
    },
    Flush {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Recent {
        resp: oneshot::Sender<Result<Vec<LogRecord>, RuntimeError>>,
    },
    Pending {
        resp: oneshot::Sender<Result<Vec<LogRecord>, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

// Buffer and store share one lock: an accept, including its batch write and
// recovery-file rewrite, never interleaves with another command.
struct Core {
    buffer: IngestionBuffer,
    store: Box<dyn DurableStore>,
}

pub fn spawn_ingest(
    buffer: IngestionBuffer,
    mut store: Box<dyn DurableStore>,
    config: RuntimeConfig,
) -> IngestHandle {
    if let Some(ms) = config.store_timeout_ms {
        if let Err(err) = store.set_timeout(Duration::from_millis(ms)) {
            warn!(error = %err, "Failed to apply store timeout");
        }
    }

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<IngestEvent>(config.event_capacity);
    let events_tx_loop = events_tx.clone();
    let core = Arc::new(Mutex::new(Core { buffer, store }));

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(cmd, &core, &events_tx_loop, &config).await;
            if done {
                break;
            }
        }
        debug!("Ingest runtime stopped");
    });

    IngestHandle {
        cmd_tx,
        events_tx,
    }
}

impl IngestHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.events_tx.subscribe()
    }

    pub async fn accept(&self, raw: RawRecord) -> Result<Ack, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Accept { raw, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Operator-triggered re-flush of everything pending.
    pub async fn flush(&self) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Flush { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Most recent durable records, newest first. Pending records are not included.
    pub async fn recent(&self) -> Result<Vec<LogRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Recent { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn pending(&self) -> Result<Vec<LogRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Pending { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Stops the runtime. Pending records stay in the recovery file.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(
    cmd: Command,
    core: &Arc<Mutex<Core>>,
    events_tx: &broadcast::Sender<IngestEvent>,
    config: &RuntimeConfig,
) -> bool {
    match cmd {
        Command::Accept { raw, resp } => {
            let res = with_core(core, move |core| {
                let Core { buffer, store } = core;
                buffer.accept(raw, &mut **store)
            })
            .await
            .and_then(|r| r.map_err(RuntimeError::from));

            if let Ok(ack) = &res {
                emit_ack_events(events_tx, ack);
            }
            let _ = resp.send(res);
        }
        Command::Flush { resp } => {
            let res = with_core(core, |core| {
                let Core { buffer, store } = core;
                let report = buffer.flush_pending(&mut **store);
                (report, buffer.len())
            })
            .await
            .and_then(|(report, pending)| {
                let res = match report.written {
                    Ok(count) => {
                        if count > 0 {
                            let _ = events_tx.send(IngestEvent::Flushed { count });
                        }
                        Ok(count)
                    }
                    Err(err) => {
                        let _ = events_tx.send(IngestEvent::FlushDeferred {
                            pending,
                            reason: err.to_string(),
                        });
                        Err(RuntimeError::from(err))
                    }
                };
                if !report.recovery_persisted {
                    let _ = events_tx.send(IngestEvent::RecoveryWriteFailed { pending });
                }
                res
            });
            let _ = resp.send(res);
        }
        Command::Recent { resp } => {
            let limit = config.query_limit;
            let res = with_core(core, move |core| core.store.recent(limit))
                .await
                .and_then(|r| r.map_err(RuntimeError::from));
            let _ = resp.send(res);
        }
        Command::Pending { resp } => {
            let res = with_core(core, |core| core.buffer.pending().to_vec()).await;
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

async fn with_core<T, F>(core: &Arc<Mutex<Core>>, f: F) -> Result<T, RuntimeError>
where
    T: Send + 'static,
    F: FnOnce(&mut Core) -> T + Send + 'static,
{
    let core_ref = Arc::clone(core);
    tokio::task::spawn_blocking(move || {
        let mut core = core_ref.blocking_lock();
        f(&mut core)
    })
    .await
    .map_err(|e| RuntimeError::Join(format!("join error: {e}")))
}

fn emit_ack_events(events_tx: &broadcast::Sender<IngestEvent>, ack: &Ack) {
    match &ack.flush {
        FlushOutcome::NotTriggered => {}
        FlushOutcome::Flushed { count } => {
            let _ = events_tx.send(IngestEvent::Flushed { count: *count });
        }
        FlushOutcome::Deferred { reason } => {
            let _ = events_tx.send(IngestEvent::FlushDeferred {
                pending: ack.pending,
                reason: reason.clone(),
            });
        }
    }
    if !ack.recovery_persisted {
        let _ = events_tx.send(IngestEvent::RecoveryWriteFailed {
            pending: ack.pending,
        });
    }
    let _ = events_tx.send(IngestEvent::Accepted {
        pending: ack.pending,
    });
}
