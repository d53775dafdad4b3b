//! Dispatch loop
//!
//! One background task per node tails the journal from the earliest
//! offset and feeds every record to the sink, strictly in order, one at
//! a time. This task is the only writer of the node's store.
//!
//! Lifecycle is an explicit Stopped -> Running -> Stopped machine.
//! Shutdown is cooperative: a watch channel flips, the loop observes it
//! at the next iteration, drops its consumer and exits. Apply failures
//! never stop the loop; a caller whose record is lost resolves through
//! the coordinator timeout instead of hanging.

use super::sink::Sink;
use crate::common::{JournalConfig, Result};
use crate::journal::{Journal, JournalConsumer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

pub struct DispatchLoop {
    stop: watch::Sender<bool>,
    state: watch::Receiver<LoopState>,
    processed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchLoop {
    /// Subscribe to the configured topic and start applying records.
    /// Subscription happens before the task spawns, so a missing topic
    /// fails here rather than inside the loop.
    pub fn start(journal: Arc<Journal>, config: &JournalConfig, sink: Sink) -> Result<Self> {
        let consumer = journal.subscribe(&config.topic)?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(LoopState::Stopped);
        let processed = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(run_loop(
            consumer,
            sink,
            stop_rx,
            state_tx,
            Arc::clone(&processed),
            config.poll_interval(),
            config.startup_lag(),
        ));

        Ok(Self {
            stop: stop_tx,
            state: state_rx,
            processed,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Total records handed to the sink so far. Monotonic; used to
    /// observe replay convergence.
    pub fn processed_records(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop and wait until it has exited.
    pub async fn stop(&mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("dispatch loop task failed: {}", e);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    mut consumer: JournalConsumer,
    sink: Sink,
    mut stop: watch::Receiver<bool>,
    state: watch::Sender<LoopState>,
    processed: Arc<AtomicU64>,
    poll_interval: Duration,
    startup_lag: Duration,
) {
    if !startup_lag.is_zero() {
        tracing::debug!(lag_ms = startup_lag.as_millis() as u64, "delaying first poll");
        tokio::time::sleep(startup_lag).await;
    }

    let _ = state.send(LoopState::Running);
    tracing::info!("dispatch loop running");

    loop {
        if *stop.borrow() {
            break;
        }
        // Biased, batch arm first: a ready batch is never dropped on
        // the floor by a racing stop signal. The stop flag is still
        // observed at the top of every iteration.
        tokio::select! {
            biased;
            batch = consumer.poll(poll_interval) => {
                match batch {
                    Ok(records) => {
                        for record in &records {
                            sink.apply(record);
                            processed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    Err(e) => {
                        tracing::info!("journal gone, dispatch loop exiting: {}", e);
                        break;
                    }
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    // Dropping the consumer is closing our log handle.
    drop(consumer);
    let _ = state.send(LoopState::Stopped);
    tracing::info!("dispatch loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{EngineConfig, SyncPolicy};
    use crate::engine::coordinator::RequestCoordinator;
    use crate::store::{MemoryStore, RegistryStore};
    use std::path::Path;
    use tempfile::tempdir;

    fn journal_config(dir: &Path) -> JournalConfig {
        JournalConfig {
            data_dir: dir.to_path_buf(),
            topic: "journal".to_string(),
            partitions: 2,
            auto_create: true,
            sync: SyncPolicy::Always,
            poll_interval_ms: 20,
            startup_lag_ms: 0,
        }
    }

    fn new_sink(store: &Arc<MemoryStore>) -> Sink {
        let coordinator = Arc::new(RequestCoordinator::new(&EngineConfig {
            response_timeout_ms: 1_000,
        }));
        Sink::new(
            Arc::clone(store) as Arc<dyn RegistryStore>,
            coordinator,
        )
    }

    async fn wait_processed(dispatch: &DispatchLoop, n: u64) {
        for _ in 0..200 {
            if dispatch.processed_records() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "dispatch loop stuck at {} of {} records",
            dispatch.processed_records(),
            n
        );
    }

    #[tokio::test]
    async fn test_processes_existing_and_new_records() {
        let dir = tempdir().unwrap();
        let config = journal_config(dir.path());
        let journal = Arc::new(Journal::open(&config).unwrap());

        // Appended before the loop starts: replayed from earliest
        journal
            .append("journal", "a", b"k1".to_vec(), Some(b"garbage".to_vec()))
            .unwrap();

        let store = Arc::new(MemoryStore::new());
        let mut dispatch =
            DispatchLoop::start(Arc::clone(&journal), &config, new_sink(&store)).unwrap();

        wait_processed(&dispatch, 1).await;
        assert_eq!(dispatch.state(), LoopState::Running);

        journal
            .append("journal", "b", b"k2".to_vec(), Some(b"garbage".to_vec()))
            .unwrap();
        wait_processed(&dispatch, 2).await;

        dispatch.stop().await;
        assert_eq!(dispatch.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_prompt() {
        let dir = tempdir().unwrap();
        let config = journal_config(dir.path());
        let journal = Arc::new(Journal::open(&config).unwrap());
        let store = Arc::new(MemoryStore::new());

        let mut dispatch =
            DispatchLoop::start(Arc::clone(&journal), &config, new_sink(&store)).unwrap();
        dispatch.stop().await;
        assert_eq!(dispatch.state(), LoopState::Stopped);
        // Second stop returns immediately
        dispatch.stop().await;
    }

    #[tokio::test]
    async fn test_loop_exits_when_journal_closes() {
        let dir = tempdir().unwrap();
        let config = journal_config(dir.path());
        let journal = Arc::new(Journal::open(&config).unwrap());
        let store = Arc::new(MemoryStore::new());

        let mut dispatch =
            DispatchLoop::start(Arc::clone(&journal), &config, new_sink(&store)).unwrap();

        journal.close().unwrap();
        for _ in 0..200 {
            if dispatch.state() == LoopState::Stopped {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(dispatch.state(), LoopState::Stopped);
        dispatch.stop().await;
    }
}
