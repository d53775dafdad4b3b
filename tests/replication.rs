//! Replication tests: several nodes share one journal, each applies
//! the same records through its own dispatch loop, and all of them end
//! up with identical state.

use bytes::Bytes;
use minireg::common::SyncPolicy;
use minireg::store::model::{ArtifactType, LogConfig, LogLevel, RuleConfig, RuleType};
use minireg::{Journal, RegistryConfig, RegistryStorage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn node_config(dir: &Path) -> RegistryConfig {
    let mut config = RegistryConfig::default();
    config.journal.data_dir = dir.to_path_buf();
    config.journal.partitions = 4;
    config.journal.sync = SyncPolicy::Never;
    config.journal.poll_interval_ms = 20;
    config.engine.response_timeout_ms = 2_000;
    config
}

fn total_records(journal: &Journal, topic: &str) -> u64 {
    (0..journal.partitions(topic).unwrap())
        .map(|p| journal.records(topic, p).unwrap().len() as u64)
        .sum()
}

async fn wait_for(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("node did not converge in time");
}

#[tokio::test]
async fn late_joiner_converges_to_identical_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = node_config(dir.path());
    let journal = Arc::new(Journal::open(&config.journal).unwrap());
    let node_a = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();

    node_a
        .create_artifact("g", "a", ArtifactType::Avro, Bytes::from_static(b"{\"v\":1}"))
        .await
        .unwrap();
    node_a
        .update_artifact("g", "a", ArtifactType::Avro, Bytes::from_static(b"{\"v\":2}"))
        .await
        .unwrap();
    node_a
        .create_artifact_rule("g", "a", RuleType::Compatibility, RuleConfig::new("BACKWARD"))
        .await
        .unwrap();
    node_a
        .create_artifact("g", "b", ArtifactType::Json, Bytes::from_static(b"true"))
        .await
        .unwrap();
    node_a
        .set_log_config(LogConfig {
            logger: "minireg::engine".to_string(),
            level: LogLevel::Trace,
        })
        .await
        .unwrap();

    // Node B joins after the fact and replays the whole journal
    let node_b = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();
    let target = total_records(&journal, &config.journal.topic);
    wait_for(|| node_b.processed_records() >= target).await;

    // Byte-for-byte the same view, timestamps and ids included
    assert_eq!(
        node_b.artifact_metadata("g", "a").unwrap(),
        node_a.artifact_metadata("g", "a").unwrap()
    );
    assert_eq!(node_b.versions("g", "a").unwrap(), vec![1, 2]);
    assert_eq!(
        node_b.artifact("g", "b").unwrap(),
        node_a.artifact("g", "b").unwrap()
    );
    assert_eq!(
        node_b.artifact_rule("g", "a", RuleType::Compatibility).unwrap(),
        RuleConfig::new("BACKWARD")
    );
    assert_eq!(
        node_b.log_config("minireg::engine").unwrap().level,
        LogLevel::Trace
    );

    let global_id = node_a.artifact_metadata("g", "a").unwrap().global_id;
    assert_eq!(
        node_b.artifact_by_global_id(global_id).unwrap(),
        node_a.artifact_by_global_id(global_id).unwrap()
    );
}

#[tokio::test]
async fn writes_propagate_between_live_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let config = node_config(dir.path());
    let journal = Arc::new(Journal::open(&config.journal).unwrap());
    let node_a = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();
    let node_b = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();

    node_a
        .create_artifact("g", "a", ArtifactType::Json, Bytes::from_static(b"1"))
        .await
        .unwrap();
    wait_for(|| node_b.artifact_exists("g", "a")).await;

    // B mutates the artifact it learned about from A
    node_b
        .update_artifact("g", "a", ArtifactType::Json, Bytes::from_static(b"2"))
        .await
        .unwrap();
    wait_for(|| {
        node_a
            .versions("g", "a")
            .map(|v| v.len() == 2)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(node_a.artifact("g", "a").unwrap().content.as_ref(), b"2");
}

#[tokio::test]
async fn restart_replays_to_identical_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = node_config(dir.path());

    let expected_meta;
    {
        let journal = Arc::new(Journal::open(&config.journal).unwrap());
        let mut node = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();

        node.create_artifact("g", "a", ArtifactType::Avro, Bytes::from_static(b"{\"v\":1}"))
            .await
            .unwrap();
        node.update_artifact("g", "a", ArtifactType::Avro, Bytes::from_static(b"{\"v\":2}"))
            .await
            .unwrap();
        node.create_artifact("g", "b", ArtifactType::Json, Bytes::from_static(b"x"))
            .await
            .unwrap();
        node.delete_artifact("g", "b").await.unwrap();
        node.create_global_rule(RuleType::Compatibility, RuleConfig::new("FORWARD"))
            .await
            .unwrap();

        expected_meta = node.artifact_metadata("g", "a").unwrap();
        node.shutdown().await;
        journal.close().unwrap();
    }

    let journal = Arc::new(Journal::open(&config.journal).unwrap());
    let node = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();
    let target = total_records(&journal, &config.journal.topic);
    wait_for(|| node.processed_records() >= target).await;

    assert_eq!(node.artifact_metadata("g", "a").unwrap(), expected_meta);
    assert_eq!(node.versions("g", "a").unwrap(), vec![1, 2]);
    assert!(!node.artifact_exists("g", "b"));
    assert_eq!(
        node.global_rule(RuleType::Compatibility).unwrap(),
        RuleConfig::new("FORWARD")
    );

    // Id assignment resumes exactly where the replayed log left off:
    // gids 1..=3 were handed out before the restart, b's deletion
    // included
    let meta = node
        .create_artifact("g", "c", ArtifactType::Json, Bytes::from_static(b"y"))
        .await
        .unwrap();
    assert_eq!(meta.global_id, 4);
}

#[tokio::test]
async fn compacted_journal_replays_clean() {
    let dir = tempfile::tempdir().unwrap();
    let config = node_config(dir.path());

    {
        let journal = Arc::new(Journal::open(&config.journal).unwrap());
        let mut node = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();

        node.create_artifact("g", "a", ArtifactType::Protobuf, Bytes::from_static(b"p1"))
            .await
            .unwrap();
        node.update_artifact("g", "a", ArtifactType::Protobuf, Bytes::from_static(b"p2"))
            .await
            .unwrap();
        node.create_artifact_rule("g", "a", RuleType::Validity, RuleConfig::new("FULL"))
            .await
            .unwrap();
        node.create_artifact("g", "b", ArtifactType::Json, Bytes::from_static(b"keep"))
            .await
            .unwrap();
        node.delete_artifact("g", "a").await.unwrap();

        node.shutdown().await;
        let stats = journal.compact(&config.journal.topic).unwrap();
        assert!(stats.kept < stats.scanned);
        journal.close().unwrap();
    }

    // Replaying the compacted journal yields the same live state; the
    // deleted artifact's history is gone from the log
    let journal = Arc::new(Journal::open(&config.journal).unwrap());
    let node = RegistryStorage::start(Arc::clone(&journal), &config).unwrap();
    let target = total_records(&journal, &config.journal.topic);
    wait_for(|| node.processed_records() >= target).await;

    assert!(!node.artifact_exists("g", "a"));
    assert_eq!(node.artifact("g", "b").unwrap().content.as_ref(), b"keep");

    // And the node keeps working on top of the compacted log
    node.update_artifact("g", "b", ArtifactType::Json, Bytes::from_static(b"more"))
        .await
        .unwrap();
    assert_eq!(node.versions("g", "b").unwrap(), vec![1, 2]);
}
