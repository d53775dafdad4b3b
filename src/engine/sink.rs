//! Apply engine
//!
//! Deterministic state transition from (store state, journal record) to
//! (new store state, business outcome). Invoked only by the dispatch
//! loop, strictly in record order, which is what gives the store its
//! single-writer semantics with no locking in here.
//!
//! Outcomes, success or typed business error, resolve the waiting
//! caller through the coordinator when the message carries a
//! correlation id. Errors never propagate to the dispatch loop.

use super::coordinator::{Applied, RequestCoordinator};
use crate::common::{Error, Result};
use crate::journal::message::{ActionType, MessageKey, MessagePayload, MessageValue};
use crate::journal::Record;
use crate::store::model::LogConfig;
use crate::store::RegistryStore;
use bytes::Bytes;
use std::sync::Arc;

pub struct Sink {
    store: Arc<dyn RegistryStore>,
    coordinator: Arc<RequestCoordinator>,
}

impl Sink {
    pub fn new(store: Arc<dyn RegistryStore>, coordinator: Arc<RequestCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Apply one journal record to the store and notify the waiting
    /// caller, if any. Never panics on malformed input; undecodable
    /// records are logged and skipped so replay always makes progress.
    pub fn apply(&self, record: &Record) {
        let value_bytes = match &record.value {
            Some(bytes) => bytes,
            None => {
                // Tombstones carry no action; they exist for compaction.
                tracing::trace!(offset = record.offset, "skipping tombstone");
                return;
            }
        };

        let key = match MessageKey::decode(&record.key) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(offset = record.offset, "undecodable message key, skipping: {}", e);
                return;
            }
        };
        let value = match MessageValue::decode(value_bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(offset = record.offset, "undecodable message value, skipping: {}", e);
                return;
            }
        };

        let correlation = value.correlation;
        let outcome = self.dispatch(&key, &value, record.timestamp);

        match (correlation, outcome) {
            (Some(id), outcome) => self.coordinator.resolve(id, outcome),
            (None, Err(e)) => {
                tracing::warn!(
                    offset = record.offset,
                    "apply failed with nobody waiting: {}",
                    e
                );
            }
            (None, Ok(_)) => {}
        }
    }

    fn dispatch(&self, key: &MessageKey, value: &MessageValue, timestamp: i64) -> Result<Applied> {
        use ActionType::*;

        match (key, &value.payload) {
            // === Content ===
            (
                MessageKey::Content {
                    tenant,
                    content_hash,
                },
                MessagePayload::Content { content },
            ) => match value.action {
                Create | Update => {
                    let bytes = content
                        .clone()
                        .ok_or_else(|| Error::Codec("content message without bytes".into()))?;
                    self.store
                        .apply_content(tenant, content_hash, Bytes::from(bytes))?;
                    Ok(Applied::None)
                }
                other => Err(unsupported(other, "content")),
            },

            // === Artifact ===
            (
                MessageKey::Artifact { tenant, group, id },
                MessagePayload::Artifact {
                    artifact_type,
                    content_hash,
                    metadata,
                },
            ) => match value.action {
                Create | Update => {
                    let artifact_type = (*artifact_type)
                        .ok_or_else(|| Error::Codec("artifact message without type".into()))?;
                    let hash = content_hash.as_deref().ok_or_else(|| {
                        Error::Codec("artifact message without content hash".into())
                    })?;
                    let meta = self.store.apply_version(
                        tenant,
                        group,
                        id,
                        artifact_type,
                        hash,
                        metadata.clone(),
                        value.action == Create,
                        timestamp,
                    )?;
                    Ok(Applied::ArtifactMeta(meta))
                }
                Delete => {
                    let versions = self.store.apply_artifact_delete(tenant, group, id)?;
                    Ok(Applied::Versions(versions))
                }
                other => Err(unsupported(other, "artifact")),
            },

            // === Artifact version ===
            (
                MessageKey::ArtifactVersion {
                    tenant,
                    group,
                    id,
                    version,
                },
                MessagePayload::Version { metadata, state },
            ) => match value.action {
                Update => {
                    if let Some(state) = state {
                        self.store
                            .apply_version_state(tenant, group, id, *version, *state, timestamp)?;
                    } else if let Some(metadata) = metadata {
                        self.store.apply_version_metadata(
                            tenant,
                            group,
                            id,
                            *version,
                            metadata.clone(),
                            timestamp,
                        )?;
                    } else {
                        return Err(Error::Codec(
                            "version update without state or metadata".into(),
                        ));
                    }
                    Ok(Applied::None)
                }
                Delete => {
                    self.store
                        .apply_version_delete(tenant, group, id, *version)?;
                    Ok(Applied::None)
                }
                Clear => {
                    self.store
                        .apply_version_metadata_clear(tenant, group, id, *version)?;
                    Ok(Applied::None)
                }
                other => Err(unsupported(other, "artifact version")),
            },

            // === Rules ===
            (
                MessageKey::ArtifactRule {
                    tenant,
                    group,
                    id,
                    rule,
                },
                MessagePayload::Rule { config },
            ) => match value.action {
                Create | Update => {
                    let config = config
                        .clone()
                        .ok_or_else(|| Error::Codec("rule message without config".into()))?;
                    self.store.apply_artifact_rule(
                        tenant,
                        group,
                        id,
                        *rule,
                        config,
                        value.action == Create,
                    )?;
                    Ok(Applied::None)
                }
                Delete => {
                    self.store
                        .apply_artifact_rule_delete(tenant, group, id, *rule)?;
                    Ok(Applied::None)
                }
                other => Err(unsupported(other, "artifact rule")),
            },
            (MessageKey::GlobalRule { tenant, rule }, MessagePayload::Rule { config }) => {
                match value.action {
                    Create | Update => {
                        let config = config
                            .clone()
                            .ok_or_else(|| Error::Codec("rule message without config".into()))?;
                        self.store
                            .apply_global_rule(tenant, *rule, config, value.action == Create)?;
                        Ok(Applied::None)
                    }
                    Delete => {
                        self.store.apply_global_rule_delete(tenant, *rule)?;
                        Ok(Applied::None)
                    }
                    other => Err(unsupported(other, "global rule")),
                }
            }

            // === Group ===
            (MessageKey::Group { tenant, group }, MessagePayload::Group) => match value.action {
                Delete => {
                    let removed = self.store.apply_group_delete(tenant, group)?;
                    tracing::debug!(group = %group, artifacts = removed.len(), "group deleted");
                    Ok(Applied::None)
                }
                other => Err(unsupported(other, "group")),
            },

            // === Log configuration ===
            (MessageKey::LogConfig { tenant, logger }, MessagePayload::LogConfig { level }) => {
                match value.action {
                    Create | Update => {
                        let level = (*level)
                            .ok_or_else(|| Error::Codec("log config message without level".into()))?;
                        self.store.apply_log_config(
                            tenant,
                            LogConfig {
                                logger: logger.clone(),
                                level,
                            },
                        )?;
                        Ok(Applied::None)
                    }
                    Delete => {
                        self.store.apply_log_config_delete(tenant, logger)?;
                        Ok(Applied::None)
                    }
                    other => Err(unsupported(other, "log config")),
                }
            }

            _ => Err(Error::Codec(
                "message key and payload kinds do not match".into(),
            )),
        }
    }
}

fn unsupported(action: ActionType, entity: &str) -> Error {
    Error::Codec(format!("unsupported action {:?} for {}", action, entity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{content_hash, EngineConfig};
    use crate::store::model::ArtifactType;
    use crate::store::{MemoryStore, DEFAULT_TENANT};

    fn setup() -> (Arc<MemoryStore>, Arc<RequestCoordinator>, Sink) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = Arc::new(RequestCoordinator::new(&EngineConfig {
            response_timeout_ms: 1_000,
        }));
        let sink = Sink::new(
            Arc::clone(&store) as Arc<dyn RegistryStore>,
            Arc::clone(&coordinator),
        );
        (store, coordinator, sink)
    }

    fn record(offset: u64, key: &MessageKey, value: Option<&MessageValue>) -> Record {
        Record {
            partition: 0,
            sequence: offset,
            offset,
            timestamp: 1_700_000_000_000 + offset as i64,
            key: key.encode().unwrap(),
            value: value.map(|v| v.encode().unwrap()),
        }
    }

    fn content_record(offset: u64, content: &[u8]) -> Record {
        let key = MessageKey::Content {
            tenant: DEFAULT_TENANT.to_string(),
            content_hash: content_hash(content),
        };
        let value = MessageValue::new(
            ActionType::Create,
            None,
            MessagePayload::Content {
                content: Some(content.to_vec()),
            },
        );
        record(offset, &key, Some(&value))
    }

    fn artifact_create(offset: u64, id: &str, content: &[u8], correlation: Option<uuid::Uuid>) -> Record {
        let key = MessageKey::Artifact {
            tenant: DEFAULT_TENANT.to_string(),
            group: "g".to_string(),
            id: id.to_string(),
        };
        let value = MessageValue::new(
            ActionType::Create,
            correlation,
            MessagePayload::Artifact {
                artifact_type: Some(ArtifactType::Avro),
                content_hash: Some(content_hash(content)),
                metadata: None,
            },
        );
        record(offset, &key, Some(&value))
    }

    #[tokio::test]
    async fn test_apply_create_resolves_waiter() {
        let (store, coordinator, sink) = setup();

        sink.apply(&content_record(0, b"schema"));
        let request = coordinator.register();
        sink.apply(&artifact_create(1, "a", b"schema", Some(request.id)));

        let outcome = coordinator.wait_for_response(request).await.unwrap();
        let meta = match outcome {
            Applied::ArtifactMeta(meta) => meta,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(meta.version, 1);
        assert!(store.is_artifact_exists(DEFAULT_TENANT, "g", "a"));
    }

    #[tokio::test]
    async fn test_apply_business_error_reaches_waiter() {
        let (_store, coordinator, sink) = setup();

        sink.apply(&content_record(0, b"schema"));
        sink.apply(&artifact_create(1, "a", b"schema", None));

        let request = coordinator.register();
        sink.apply(&artifact_create(2, "a", b"schema", Some(request.id)));
        let err = coordinator.wait_for_response(request).await.unwrap_err();
        assert!(matches!(err, Error::ArtifactAlreadyExists { .. }));
    }

    #[test]
    fn test_tombstones_and_garbage_are_skipped() {
        let (store, _coordinator, sink) = setup();

        // Pure tombstone
        let key = MessageKey::Artifact {
            tenant: DEFAULT_TENANT.to_string(),
            group: "g".to_string(),
            id: "a".to_string(),
        };
        sink.apply(&record(0, &key, None));

        // Undecodable key and value
        sink.apply(&Record {
            partition: 0,
            sequence: 1,
            offset: 1,
            timestamp: 0,
            key: b"not json".to_vec(),
            value: Some(b"{}".to_vec()),
        });
        sink.apply(&Record {
            partition: 0,
            sequence: 2,
            offset: 2,
            timestamp: 0,
            key: key.encode().unwrap(),
            value: Some(b"not json".to_vec()),
        });

        assert!(!store.is_artifact_exists(DEFAULT_TENANT, "g", "a"));
    }

    #[tokio::test]
    async fn test_mismatched_key_and_payload() {
        let (_store, coordinator, sink) = setup();

        let key = MessageKey::Group {
            tenant: DEFAULT_TENANT.to_string(),
            group: "g".to_string(),
        };
        let request = coordinator.register();
        let value = MessageValue::new(
            ActionType::Delete,
            Some(request.id),
            MessagePayload::Rule { config: None },
        );
        sink.apply(&record(0, &key, Some(&value)));

        let err = coordinator.wait_for_response(request).await.unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
