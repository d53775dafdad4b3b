//! In-process partitioned journal
//!
//! The journal is the system of record: an ordered, partitioned,
//! key-compactable append-only log. Every mutation is appended here
//! first and applied to node state only by replay. The ordering
//! contract is explicit and tested:
//!
//! - records with equal partition keys land in the same partition
//! - within a partition, offsets are strictly increasing and consumers
//!   observe records in offset order
//! - every record carries a topic-wide sequence number assigned at
//!   append time, and consumers observe records across partitions in
//!   sequence order
//! - compaction keeps the newest record per key, drops keys whose
//!   newest record is a tombstone, and never renumbers offsets or
//!   sequences
//!
//! The sequence is what makes replay deterministic: a node that joins
//! or restarts applies the retained records in exactly the order they
//! were originally appended, so counters derived during application
//! (global ids, content ids) come out identical on every node.
//!
//! Consumers always subscribe from the earliest retained offset, so a
//! fresh node rebuilds its full state by replay. Partitions persist to
//! segment files under `<data_dir>/<topic>/p<i>.log` and survive
//! restarts.

pub mod message;
pub mod segment;

pub use message::{ActionType, MessageKey, MessagePayload, MessageValue};
pub use segment::SegmentWriter;

use crate::common::{partition_for_key, Error, JournalConfig, Result, SyncPolicy};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// Most records a single poll hands out per partition.
const MAX_POLL_RECORDS: usize = 500;

/// One journal record as stored and replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub partition: u32,
    /// Topic-wide append order. Consumers deliver records across
    /// partitions in this order.
    pub sequence: u64,
    pub offset: u64,
    /// Append time in epoch millis, identical for every consumer.
    pub timestamp: i64,
    pub key: Vec<u8>,
    /// `None` marks a tombstone.
    pub value: Option<Vec<u8>>,
}

/// Broker acknowledgment of a durable append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordAck {
    pub partition: u32,
    pub offset: u64,
}

/// Topic layout requested at provisioning time.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: u32,
}

/// Outcome of one compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub scanned: usize,
    pub kept: usize,
    pub purged_keys: usize,
}

struct Partition {
    path: PathBuf,
    // Sorted by offset; compaction leaves gaps but never reorders.
    records: Vec<Record>,
    next_offset: u64,
    writer: SegmentWriter,
}

impl Partition {
    fn open(path: PathBuf, index: u32, sync_policy: SyncPolicy) -> Result<Self> {
        let mut records = Vec::new();
        SegmentWriter::replay(&path, index, |r| {
            records.push(r);
            Ok(())
        })?;
        let next_offset = records.last().map(|r| r.offset + 1).unwrap_or(0);
        let writer = SegmentWriter::open(&path, sync_policy)?;
        Ok(Self {
            path,
            records,
            next_offset,
            writer,
        })
    }
}

struct Topic {
    name: String,
    partitions: Vec<Mutex<Partition>>,
    // Next topic-wide sequence. Held across the whole append, so a
    // record only becomes visible once every smaller sequence is.
    sequencer: Mutex<u64>,
    notify: Notify,
}

/// The journal broker. Shared between every node of a cluster via
/// `Arc`; nodes interact only through [`Journal::append`] and their
/// own [`JournalConsumer`].
pub struct Journal {
    root: PathBuf,
    sync_policy: SyncPolicy,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    closed: Arc<AtomicBool>,
}

impl Journal {
    /// Open the journal under the configured data directory, replaying
    /// any existing topics, and auto-provision the configured topic if
    /// requested.
    pub fn open(config: &JournalConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let journal = Self {
            root: config.data_dir.clone(),
            sync_policy: config.sync,
            topics: RwLock::new(HashMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
        };
        journal.load_existing()?;
        if config.auto_create {
            journal.provision_topic(&TopicSpec {
                name: config.topic.clone(),
                partitions: config.partitions,
            })?;
        }
        Ok(journal)
    }

    fn load_existing(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let dir = entry.path();
            let mut count: u32 = 0;
            while dir.join(format!("p{}.log", count)).exists() {
                count += 1;
            }
            if count == 0 {
                continue;
            }
            let topic = Self::open_topic(&name, &dir, count, self.sync_policy)?;
            tracing::debug!(topic = %name, partitions = count, "loaded journal topic");
            self.topics.write().unwrap().insert(name, Arc::new(topic));
        }
        Ok(())
    }

    fn open_topic(name: &str, dir: &Path, partitions: u32, sync_policy: SyncPolicy) -> Result<Topic> {
        let mut parts = Vec::with_capacity(partitions as usize);
        for i in 0..partitions {
            let path = dir.join(format!("p{}.log", i));
            parts.push(Mutex::new(Partition::open(path, i, sync_policy)?));
        }
        // The topic-wide newest record is the tail of its partition and
        // compaction always retains tails, so the max over tails is the
        // highest sequence ever handed out.
        let next_sequence = parts
            .iter()
            .filter_map(|p| p.lock().unwrap().records.last().map(|r| r.sequence + 1))
            .max()
            .unwrap_or(0);
        Ok(Topic {
            name: name.to_string(),
            partitions: parts,
            sequencer: Mutex::new(next_sequence),
            notify: Notify::new(),
        })
    }

    /// Create a topic if it does not exist yet. Re-provisioning an
    /// existing topic keeps its layout.
    pub fn provision_topic(&self, spec: &TopicSpec) -> Result<()> {
        self.ensure_open()?;
        if spec.partitions == 0 {
            return Err(Error::InvalidConfig(
                "topic must have at least one partition".into(),
            ));
        }
        let mut topics = self.topics.write().unwrap();
        if let Some(existing) = topics.get(&spec.name) {
            if existing.partitions.len() != spec.partitions as usize {
                tracing::warn!(
                    topic = %spec.name,
                    existing = existing.partitions.len(),
                    requested = spec.partitions,
                    "topic already provisioned, keeping existing partition layout"
                );
            }
            return Ok(());
        }
        let dir = self.root.join(&spec.name);
        std::fs::create_dir_all(&dir)?;
        let topic = Self::open_topic(&spec.name, &dir, spec.partitions, self.sync_policy)?;
        tracing::info!(topic = %spec.name, partitions = spec.partitions, "provisioned journal topic");
        topics.insert(spec.name.clone(), Arc::new(topic));
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::JournalUnavailable("journal is closed".into()));
        }
        Ok(())
    }

    fn topic(&self, name: &str) -> Result<Arc<Topic>> {
        self.topics
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::JournalUnavailable(format!("topic {} not provisioned", name)))
    }

    /// Append a record. The partition is chosen by hashing
    /// `partition_key`; a `None` value appends a tombstone. Returns
    /// once the record is durable per the sync policy.
    pub fn append(
        &self,
        topic: &str,
        partition_key: &str,
        key: Vec<u8>,
        value: Option<Vec<u8>>,
    ) -> Result<RecordAck> {
        self.ensure_open()?;
        let topic = self.topic(topic)?;
        let partition = partition_for_key(partition_key, topic.partitions.len() as u32);

        let ack = {
            let mut sequencer = topic.sequencer.lock().unwrap();
            let mut part = topic.partitions[partition as usize].lock().unwrap();
            let record = Record {
                partition,
                sequence: *sequencer,
                offset: part.next_offset,
                timestamp: Utc::now().timestamp_millis(),
                key,
                value,
            };
            part.writer.append(&record)?;
            let ack = RecordAck {
                partition,
                offset: record.offset,
            };
            part.records.push(record);
            part.next_offset += 1;
            *sequencer += 1;
            ack
        };

        topic.notify.notify_waiters();
        Ok(ack)
    }

    /// Subscribe from the earliest retained offset of every partition.
    pub fn subscribe(&self, topic: &str) -> Result<JournalConsumer> {
        self.ensure_open()?;
        let topic = self.topic(topic)?;
        let positions = vec![0; topic.partitions.len()];
        Ok(JournalConsumer {
            topic,
            closed: Arc::clone(&self.closed),
            positions,
        })
    }

    /// Compact a topic: keep the newest record per key, drop keys whose
    /// newest record is a tombstone. Offsets of surviving records are
    /// preserved, so consumer positions stay valid.
    pub fn compact(&self, topic: &str) -> Result<CompactionStats> {
        self.ensure_open()?;
        let topic = self.topic(topic)?;
        let mut stats = CompactionStats::default();

        for partition in &topic.partitions {
            let mut part = partition.lock().unwrap();
            stats.scanned += part.records.len();

            let mut newest: HashMap<Vec<u8>, usize> = HashMap::new();
            for (i, record) in part.records.iter().enumerate() {
                newest.insert(record.key.clone(), i);
            }

            // The tail record is always retained, tombstone or not, so
            // offset assignment resumes correctly after a restart.
            let tail = part.records.len().checked_sub(1);
            let mut kept = Vec::new();
            for (i, record) in part.records.iter().enumerate() {
                if newest[&record.key] != i {
                    continue;
                }
                if record.value.is_none() && Some(i) != tail {
                    stats.purged_keys += 1;
                    continue;
                }
                kept.push(record.clone());
            }

            part.writer = SegmentWriter::rewrite(&part.path, &kept, self.sync_policy)?;
            stats.kept += kept.len();
            part.records = kept;
        }

        tracing::info!(
            topic = %topic.name,
            scanned = stats.scanned,
            kept = stats.kept,
            purged_keys = stats.purged_keys,
            "journal compaction finished"
        );
        Ok(stats)
    }

    /// Snapshot of one partition's retained records, for inspection.
    pub fn records(&self, topic: &str, partition: u32) -> Result<Vec<Record>> {
        let topic = self.topic(topic)?;
        let part = topic
            .partitions
            .get(partition as usize)
            .ok_or_else(|| Error::JournalUnavailable(format!("no partition {}", partition)))?;
        let records = part.lock().unwrap().records.clone();
        Ok(records)
    }

    pub fn partitions(&self, topic: &str) -> Result<u32> {
        Ok(self.topic(topic)?.partitions.len() as u32)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Flush everything and refuse further appends. Blocked pollers
    /// wake up and observe the closure.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let topics = self.topics.read().unwrap();
        for topic in topics.values() {
            for partition in &topic.partitions {
                partition.lock().unwrap().writer.sync()?;
            }
            topic.notify.notify_waiters();
        }
        tracing::info!("journal closed");
        Ok(())
    }
}

/// Tail of one topic, starting at the earliest offset.
///
/// Batches come back merged across partitions in sequence order. Not
/// shared between tasks; each dispatch loop owns one consumer.
pub struct JournalConsumer {
    topic: Arc<Topic>,
    closed: Arc<AtomicBool>,
    // Next offset to hand out, per partition.
    positions: Vec<u64>,
}

impl JournalConsumer {
    /// Wait up to `max_wait` for records. Returns an empty batch on
    /// timeout and an error once the journal is closed.
    pub async fn poll(&mut self, max_wait: Duration) -> Result<Vec<Record>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            // Register for wakeups before checking, so an append racing
            // with this poll cannot be missed. The notify handle is
            // cloned out so the registration does not borrow `self`
            // across the fetch below.
            let topic = Arc::clone(&self.topic);
            let notified = topic.notify.notified();
            tokio::pin!(notified);

            let batch = self.fetch();
            if !batch.is_empty() {
                return Ok(batch);
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::JournalUnavailable("journal is closed".into()));
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(Vec::new()),
            }
        }
    }

    fn fetch(&mut self) -> Vec<Record> {
        // Sequences below this are fully published; a record appended
        // while the scan walks the partitions stays queued for the next
        // poll. A partition with more pending records than the cap
        // lowers the ceiling further, so a capped poll never hands out
        // sequences out of order either.
        let mut ceiling = *self.topic.sequencer.lock().unwrap();

        let mut batch = Vec::new();
        for (i, position) in self.positions.iter().enumerate() {
            let part = self.topic.partitions[i].lock().unwrap();
            let start = part.records.partition_point(|r| r.offset < *position);
            let end = (start + MAX_POLL_RECORDS).min(part.records.len());
            batch.extend_from_slice(&part.records[start..end]);
            if end < part.records.len() {
                ceiling = ceiling.min(part.records[end].sequence);
            }
        }

        batch.sort_unstable_by_key(|r| r.sequence);
        let cut = batch.partition_point(|r| r.sequence < ceiling);
        batch.truncate(cut);
        for record in &batch {
            self.positions[record.partition as usize] = record.offset + 1;
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &Path, partitions: u32) -> JournalConfig {
        JournalConfig {
            data_dir: dir.to_path_buf(),
            topic: "journal".to_string(),
            partitions,
            auto_create: true,
            sync: SyncPolicy::Always,
            poll_interval_ms: 20,
            startup_lag_ms: 0,
        }
    }

    fn short() -> Duration {
        Duration::from_millis(100)
    }

    #[tokio::test]
    async fn test_same_key_keeps_order() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 8)).unwrap();

        // All appends for one entity go through one partition, in order
        let mut acks = Vec::new();
        for i in 0..20u8 {
            let ack = journal
                .append("journal", "t/g/a", format!("k{}", i).into_bytes(), Some(vec![i]))
                .unwrap();
            acks.push(ack);
        }
        let partition = acks[0].partition;
        assert!(acks.iter().all(|a| a.partition == partition));
        let offsets: Vec<u64> = acks.iter().map(|a| a.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);

        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        let values: Vec<u8> = batch.iter().filter_map(|r| r.value.as_ref().map(|v| v[0])).collect();
        assert_eq!(values, (0..20).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_consumers_see_global_append_order() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 4)).unwrap();

        // Two keys known to land in different partitions
        let right = (0..64)
            .map(|i| format!("right-{}", i))
            .find(|k| partition_for_key(k, 4) != partition_for_key("left", 4))
            .unwrap();
        for i in 0..20u8 {
            let key = if i % 2 == 0 { "left" } else { right.as_str() };
            journal
                .append("journal", key, vec![i], Some(vec![i]))
                .unwrap();
        }

        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        let values: Vec<u8> = batch.iter().map(|r| r.value.as_ref().unwrap()[0]).collect();
        assert_eq!(values, (0..20).collect::<Vec<u8>>());
        let sequences: Vec<u64> = batch.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (0..20).collect::<Vec<u64>>());

        // The same order again after a restart
        journal.close().unwrap();
        let journal = Journal::open(&config(dir.path(), 4)).unwrap();
        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        let values: Vec<u8> = batch.iter().map(|r| r.value.as_ref().unwrap()[0]).collect();
        assert_eq!(values, (0..20).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_poll_cap_never_reorders_across_partitions() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        cfg.sync = SyncPolicy::Never;
        let journal = Journal::open(&cfg).unwrap();

        let right = (0..64)
            .map(|i| format!("right-{}", i))
            .find(|k| partition_for_key(k, 2) != partition_for_key("left", 2))
            .unwrap();
        for i in 0..600u64 {
            journal
                .append("journal", "left", i.to_le_bytes().to_vec(), Some(Vec::new()))
                .unwrap();
        }
        journal
            .append("journal", &right, b"tail".to_vec(), Some(Vec::new()))
            .unwrap();

        // The first poll is capped mid-partition, so the record behind
        // the cap in the other partition must wait for the next poll
        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        assert_eq!(batch.len(), MAX_POLL_RECORDS);
        assert_eq!(batch.last().unwrap().sequence, MAX_POLL_RECORDS as u64 - 1);

        let batch = consumer.poll(short()).await.unwrap();
        assert_eq!(batch.len(), 101);
        assert_eq!(batch.last().unwrap().sequence, 600);
        assert_eq!(batch.last().unwrap().key, b"tail");
    }

    #[tokio::test]
    async fn test_consumer_sees_earlier_and_later_appends() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 2)).unwrap();

        journal.append("journal", "a", b"k1".to_vec(), Some(b"v1".to_vec())).unwrap();
        journal.append("journal", "b", b"k2".to_vec(), Some(b"v2".to_vec())).unwrap();

        let mut consumer = journal.subscribe("journal").unwrap();
        let mut seen = consumer.poll(short()).await.unwrap();
        while seen.len() < 2 {
            seen.extend(consumer.poll(short()).await.unwrap());
        }
        assert_eq!(seen.len(), 2);

        journal.append("journal", "a", b"k3".to_vec(), None).unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].value, None);

        // Nothing more: poll times out with an empty batch
        let batch = consumer.poll(Duration::from_millis(30)).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_replays_and_continues_offsets() {
        let dir = tempdir().unwrap();

        {
            let journal = Journal::open(&config(dir.path(), 1)).unwrap();
            journal.append("journal", "x", b"k1".to_vec(), Some(b"v1".to_vec())).unwrap();
            journal.append("journal", "x", b"k2".to_vec(), Some(b"v2".to_vec())).unwrap();
            journal.close().unwrap();
        }

        let journal = Journal::open(&config(dir.path(), 1)).unwrap();
        let ack = journal
            .append("journal", "x", b"k3".to_vec(), Some(b"v3".to_vec()))
            .unwrap();
        assert_eq!(ack.offset, 2);

        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].key, b"k1");
    }

    #[tokio::test]
    async fn test_compaction_keeps_newest_and_purges_tombstoned() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 1)).unwrap();

        journal.append("journal", "x", b"a".to_vec(), Some(b"a1".to_vec())).unwrap();
        journal.append("journal", "x", b"b".to_vec(), Some(b"b1".to_vec())).unwrap();
        journal.append("journal", "x", b"a".to_vec(), Some(b"a2".to_vec())).unwrap();
        journal.append("journal", "x", b"b".to_vec(), None).unwrap();
        journal.append("journal", "x", b"c".to_vec(), Some(b"c1".to_vec())).unwrap();

        let stats = journal.compact("journal").unwrap();
        assert_eq!(stats.scanned, 5);
        assert_eq!(stats.kept, 2);
        assert_eq!(stats.purged_keys, 1);

        let records = journal.records("journal", 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, b"a");
        assert_eq!(records[0].value.as_deref(), Some(b"a2".as_slice()));
        // Offsets survive compaction
        assert_eq!(records[0].offset, 2);
        assert_eq!(records[1].offset, 4);

        // A fresh consumer replays only the retained records
        let mut consumer = journal.subscribe("journal").unwrap();
        let batch = consumer.poll(short()).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].offset, 2);

        // Appends continue past the compacted tail
        let ack = journal.append("journal", "x", b"d".to_vec(), Some(b"d1".to_vec())).unwrap();
        assert_eq!(ack.offset, 5);
    }

    #[tokio::test]
    async fn test_compaction_retains_tail_tombstone() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 1)).unwrap();

        journal.append("journal", "x", b"a".to_vec(), Some(b"a1".to_vec())).unwrap();
        journal.append("journal", "x", b"a".to_vec(), None).unwrap();

        let stats = journal.compact("journal").unwrap();
        assert_eq!(stats.purged_keys, 0);

        // The tombstone sits at the tail, so it stays put and keeps the
        // next offset stable across a reopen
        let records = journal.records("journal", 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, None);
        assert_eq!(records[0].offset, 1);

        journal.close().unwrap();
        let journal = Journal::open(&config(dir.path(), 1)).unwrap();
        let ack = journal.append("journal", "x", b"b".to_vec(), Some(b"b1".to_vec())).unwrap();
        assert_eq!(ack.offset, 2);
    }

    #[tokio::test]
    async fn test_compaction_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let journal = Journal::open(&config(dir.path(), 1)).unwrap();
            journal.append("journal", "x", b"a".to_vec(), Some(b"a1".to_vec())).unwrap();
            journal.append("journal", "x", b"a".to_vec(), Some(b"a2".to_vec())).unwrap();
            journal.compact("journal").unwrap();
            journal.close().unwrap();
        }
        let journal = Journal::open(&config(dir.path(), 1)).unwrap();
        let records = journal.records("journal", 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, 1);
        // next_offset and the sequencer were rebuilt from the surviving
        // tail
        let ack = journal.append("journal", "x", b"b".to_vec(), Some(b"b1".to_vec())).unwrap();
        assert_eq!(ack.offset, 2);
        assert_eq!(journal.records("journal", 0).unwrap()[1].sequence, 2);
    }

    #[tokio::test]
    async fn test_closed_journal_rejects_everything() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(&config(dir.path(), 1)).unwrap();
        let mut consumer = journal.subscribe("journal").unwrap();

        journal.close().unwrap();

        let err = journal
            .append("journal", "x", b"k".to_vec(), Some(b"v".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::JournalUnavailable(_)));

        let err = consumer.poll(short()).await.unwrap_err();
        assert!(matches!(err, Error::JournalUnavailable(_)));

        // Closing twice is fine
        journal.close().unwrap();
    }

    #[test]
    fn test_unknown_topic() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), 1);
        cfg.auto_create = false;
        let journal = Journal::open(&cfg).unwrap();
        let err = journal
            .append("missing", "x", b"k".to_vec(), None)
            .unwrap_err();
        assert!(matches!(err, Error::JournalUnavailable(_)));
    }
}
