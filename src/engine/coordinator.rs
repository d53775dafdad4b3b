//! Request coordinator
//!
//! Bridges the asynchronous journal-apply step back to synchronous
//! caller semantics. A mutating call registers a fresh correlation id,
//! embeds it in the submitted message, and blocks here until the sink
//! resolves that id with the business outcome, or the timeout fires.
//!
//! Every slot is single-use: registered by exactly one caller, resolved
//! by at most one sink notification. Ids that nobody is waiting for
//! (replayed records, timed-out callers) are dropped quietly.

use crate::common::{EngineConfig, Error, Result};
use crate::store::model::ArtifactMetaData;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Business outcome of applying one journal message.
#[derive(Debug, Clone)]
pub enum Applied {
    /// Metadata of the artifact version a create or update produced.
    ArtifactMeta(ArtifactMetaData),
    /// Version numbers removed by an artifact delete.
    Versions(Vec<i64>),
    /// The mutation succeeded with nothing to report.
    None,
}

/// A registered wait slot. Pass it back to
/// [`RequestCoordinator::wait_for_response`] to block on the outcome.
pub struct PendingRequest {
    pub id: Uuid,
    rx: oneshot::Receiver<Result<Applied>>,
}

pub struct RequestCoordinator {
    timeout: Duration,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<Result<Applied>>>>,
}

impl RequestCoordinator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            timeout: config.response_timeout(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Register a fresh correlation id. Register before submitting, so
    /// a sink running ahead of the caller cannot resolve an unknown id.
    pub fn register(&self) -> PendingRequest {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);
        PendingRequest { id, rx }
    }

    /// Drop a slot whose message never made it into the journal.
    pub fn abandon(&self, request: &PendingRequest) {
        self.pending.lock().unwrap().remove(&request.id);
    }

    /// Resolve a correlation id with the sink outcome. Called only from
    /// the dispatch loop. Unknown ids are dropped: the waiter may have
    /// timed out, or the record is a replay on a node that never issued
    /// the call.
    pub fn resolve(&self, id: Uuid, outcome: Result<Applied>) {
        let slot = self.pending.lock().unwrap().remove(&id);
        match slot {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!(correlation = %id, "waiter gone before resolution");
                }
            }
            None => {
                tracing::debug!(correlation = %id, "no waiter for resolution, dropping");
            }
        }
    }

    /// Block until the request resolves or the configured timeout
    /// elapses, whichever comes first.
    pub async fn wait_for_response(&self, request: PendingRequest) -> Result<Applied> {
        match tokio::time::timeout(self.timeout, request.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::Internal(
                "completion slot dropped without resolution".into(),
            )),
            Err(_) => {
                // The message may still apply later; it is just no
                // longer observed by this caller.
                self.pending.lock().unwrap().remove(&request.id);
                Err(Error::Timeout(format!(
                    "no response for request {} within {:?}",
                    request.id, self.timeout
                )))
            }
        }
    }

    /// Number of callers currently blocked, for shutdown diagnostics.
    pub fn outstanding(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
