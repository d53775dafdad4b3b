//! Message submitter
//!
//! Thin append-side of the engine: encodes typed messages and hands
//! them to the journal. A successful submit means the journal has
//! acknowledged durability of the append, nothing more; the business
//! outcome arrives later through the coordinator.

use crate::journal::{Journal, MessageKey, MessageValue, RecordAck};
use crate::Result;
use std::sync::Arc;

pub struct Submitter {
    journal: Arc<Journal>,
    topic: String,
}

impl Submitter {
    pub fn new(journal: Arc<Journal>, topic: String) -> Self {
        Self { journal, topic }
    }

    /// Append a message. Resolves once the journal acknowledges the
    /// append; fails with `JournalUnavailable` before any side effect
    /// exists anywhere if the journal is unreachable.
    pub async fn submit(&self, key: &MessageKey, value: &MessageValue) -> Result<RecordAck> {
        self.submit_routed(key, &key.partition_key(), value).await
    }

    /// Append a message routed by an explicit partition key instead of
    /// the key's own. Content records ride the partition of the
    /// artifact that references them: a node tailing or replaying the
    /// journal then always applies the content before the version that
    /// points at it, because both live in one ordered partition.
    pub async fn submit_routed(
        &self,
        key: &MessageKey,
        partition_key: &str,
        value: &MessageValue,
    ) -> Result<RecordAck> {
        let ack = self.journal.append(
            &self.topic,
            partition_key,
            key.encode()?,
            Some(value.encode()?),
        )?;
        tracing::trace!(
            partition = ack.partition,
            offset = ack.offset,
            "submitted journal message"
        );
        Ok(ack)
    }

    /// Append a tombstone for a key, marking it for removal at the next
    /// compaction. Callers treat this as fire-and-forget.
    pub async fn submit_tombstone(&self, key: &MessageKey) -> Result<RecordAck> {
        let ack = self
            .journal
            .append(&self.topic, &key.partition_key(), key.encode()?, None)?;
        tracing::trace!(
            partition = ack.partition,
            offset = ack.offset,
            "submitted tombstone"
        );
        Ok(ack)
    }
}
