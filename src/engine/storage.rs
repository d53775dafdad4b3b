//! Storage facade
//!
//! The public surface of a registry node. Mutations are synchronous in
//! signature but asynchronous underneath: the call validates against
//! the local store, submits a message to the journal, then blocks on
//! the coordinator until this node's own dispatch loop has applied the
//! record and resolved the correlation id. A call that fails its
//! pre-check never reaches the journal, so a compacted topic carries
//! no records for entities that never existed. Reads never touch the
//! journal; they are served from the local store, which gives
//! read-your-own-writes on the calling node and replay-lag-bounded
//! freshness on the others.

use super::coordinator::{Applied, RequestCoordinator};
use super::dispatch::{DispatchLoop, LoopState};
use super::sink::Sink;
use super::submitter::Submitter;
use crate::common::{content_hash, Error, RegistryConfig, Result};
use crate::journal::message::{ActionType, MessageKey, MessagePayload, MessageValue};
use crate::journal::Journal;
use crate::store::model::{
    ArtifactMetaData, ArtifactSearchResults, ArtifactState, ArtifactType,
    EditableArtifactMetaData, LogConfig, OrderBy, OrderDirection, RuleConfig, RuleType,
    SearchFilter, StoredArtifact, VersionMetaData, VersionSearchResults,
};
use crate::store::{MemoryStore, RegistryStore, DEFAULT_TENANT};
use bytes::Bytes;
use std::sync::Arc;

fn expect_meta(outcome: Applied) -> Result<ArtifactMetaData> {
    match outcome {
        Applied::ArtifactMeta(meta) => Ok(meta),
        other => Err(Error::Internal(format!(
            "unexpected apply outcome: {:?}",
            other
        ))),
    }
}

fn expect_versions(outcome: Applied) -> Result<Vec<i64>> {
    match outcome {
        Applied::Versions(versions) => Ok(versions),
        other => Err(Error::Internal(format!(
            "unexpected apply outcome: {:?}",
            other
        ))),
    }
}

/// Swallow policy for bulk rule deletion: a rule that was never
/// configured is not an error to the caller.
fn swallow_rule_not_found(result: Result<Applied>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(Error::RuleNotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

fn ensure_operable(state: ArtifactState) -> Result<()> {
    if !ArtifactState::OPERABLE.contains(&state) {
        return Err(Error::InvalidStateTransition {
            from: state.to_string(),
            to: state.to_string(),
        });
    }
    Ok(())
}

/// One registry node: a store fed by its own dispatch loop, plus the
/// submit side shared through the journal.
pub struct RegistryStorage {
    tenant: String,
    store: Arc<dyn RegistryStore>,
    submitter: Submitter,
    coordinator: Arc<RequestCoordinator>,
    dispatch: DispatchLoop,
}

impl RegistryStorage {
    /// Start a node for the default tenant.
    pub fn start(journal: Arc<Journal>, config: &RegistryConfig) -> Result<Self> {
        Self::start_with_tenant(journal, config, DEFAULT_TENANT)
    }

    /// Start a node: fresh store, subscription from the earliest
    /// offset, dispatch loop running. The store converges to the
    /// journal contents as the loop catches up.
    pub fn start_with_tenant(
        journal: Arc<Journal>,
        config: &RegistryConfig,
        tenant: &str,
    ) -> Result<Self> {
        let store: Arc<dyn RegistryStore> = Arc::new(MemoryStore::new());
        let coordinator = Arc::new(RequestCoordinator::new(&config.engine));
        let sink = Sink::new(Arc::clone(&store), Arc::clone(&coordinator));
        let dispatch = DispatchLoop::start(Arc::clone(&journal), &config.journal, sink)?;
        let submitter = Submitter::new(journal, config.journal.topic.clone());
        tracing::debug!(tenant = %tenant, "registry storage started");
        Ok(Self {
            tenant: tenant.to_string(),
            store,
            submitter,
            coordinator,
            dispatch,
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn dispatch_state(&self) -> LoopState {
        self.dispatch.state()
    }

    /// Records this node has applied so far; grows monotonically as the
    /// node catches up with the journal.
    pub fn processed_records(&self) -> u64 {
        self.dispatch.processed_records()
    }

    /// Stop the dispatch loop. Outstanding waiters resolve through the
    /// coordinator timeout.
    pub async fn shutdown(&mut self) {
        let outstanding = self.coordinator.outstanding();
        if outstanding > 0 {
            tracing::warn!(outstanding, "shutting down with callers still waiting");
        }
        self.dispatch.stop().await;
    }

    // === Submit plumbing ===

    async fn roundtrip(
        &self,
        key: MessageKey,
        action: ActionType,
        payload: MessagePayload,
    ) -> Result<Applied> {
        let partition_key = key.partition_key();
        self.roundtrip_routed(key, &partition_key, action, payload)
            .await
    }

    async fn roundtrip_routed(
        &self,
        key: MessageKey,
        partition_key: &str,
        action: ActionType,
        payload: MessagePayload,
    ) -> Result<Applied> {
        let request = self.coordinator.register();
        let value = MessageValue::new(action, Some(request.id), payload);
        if let Err(e) = self
            .submitter
            .submit_routed(&key, partition_key, &value)
            .await
        {
            self.coordinator.abandon(&request);
            return Err(e);
        }
        self.coordinator.wait_for_response(request).await
    }

    async fn tombstone(&self, key: MessageKey) {
        if let Err(e) = self.submitter.submit_tombstone(&key).await {
            tracing::warn!("tombstone append failed: {}", e);
        }
    }

    /// Make content durable before the entity that references it.
    /// Returns the content hash. Content rows are never deleted, so a
    /// failed follow-up mutation can leave unreferenced content behind.
    ///
    /// The record is routed with the referencing artifact's partition
    /// key, not its own: the content and the artifact mutation that
    /// needs it then share a partition, and every node applies them in
    /// submission order even when it replays from the earliest offset.
    /// The compaction slot is still the hash, so resubmitting the same
    /// bytes for another artifact overwrites rather than duplicates.
    async fn ensure_content(&self, group: &str, id: &str, content: &Bytes) -> Result<String> {
        let hash = content_hash(content);
        if self.store.is_content_exists(&self.tenant, &hash) {
            return Ok(hash);
        }
        // Two nodes may both observe the content as absent and submit
        // it; the duplicate applies as a no-op keyed by the same hash.
        let key = MessageKey::Content {
            tenant: self.tenant.clone(),
            content_hash: hash.clone(),
        };
        self.roundtrip_routed(
            key,
            &self.artifact_key(group, id).partition_key(),
            ActionType::Create,
            MessagePayload::Content {
                content: Some(content.to_vec()),
            },
        )
        .await?;
        Ok(hash)
    }

    // === Key builders ===

    fn artifact_key(&self, group: &str, id: &str) -> MessageKey {
        MessageKey::Artifact {
            tenant: self.tenant.clone(),
            group: group.to_string(),
            id: id.to_string(),
        }
    }

    fn version_key(&self, group: &str, id: &str, version: i64) -> MessageKey {
        MessageKey::ArtifactVersion {
            tenant: self.tenant.clone(),
            group: group.to_string(),
            id: id.to_string(),
            version,
        }
    }

    fn rule_key(&self, group: &str, id: &str, rule: RuleType) -> MessageKey {
        MessageKey::ArtifactRule {
            tenant: self.tenant.clone(),
            group: group.to_string(),
            id: id.to_string(),
            rule,
        }
    }

    fn global_rule_key(&self, rule: RuleType) -> MessageKey {
        MessageKey::GlobalRule {
            tenant: self.tenant.clone(),
            rule,
        }
    }

    fn group_key(&self, group: &str) -> MessageKey {
        MessageKey::Group {
            tenant: self.tenant.clone(),
            group: group.to_string(),
        }
    }

    fn log_key(&self, logger: &str) -> MessageKey {
        MessageKey::LogConfig {
            tenant: self.tenant.clone(),
            logger: logger.to_string(),
        }
    }

    // === Artifact lifecycle ===

    pub async fn create_artifact(
        &self,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        content: Bytes,
    ) -> Result<ArtifactMetaData> {
        self.create_artifact_with_metadata(group, id, artifact_type, content, None)
            .await
    }

    pub async fn create_artifact_with_metadata(
        &self,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        content: Bytes,
        metadata: Option<EditableArtifactMetaData>,
    ) -> Result<ArtifactMetaData> {
        if self.store.is_artifact_exists(&self.tenant, group, id) {
            return Err(Error::ArtifactAlreadyExists {
                group: group.to_string(),
                artifact: id.to_string(),
            });
        }
        let hash = self.ensure_content(group, id, &content).await?;
        let outcome = self
            .roundtrip(
                self.artifact_key(group, id),
                ActionType::Create,
                MessagePayload::Artifact {
                    artifact_type: Some(artifact_type),
                    content_hash: Some(hash),
                    metadata,
                },
            )
            .await?;
        expect_meta(outcome)
    }

    /// Store a new version of an existing artifact.
    pub async fn update_artifact(
        &self,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        content: Bytes,
    ) -> Result<ArtifactMetaData> {
        self.update_artifact_with_metadata(group, id, artifact_type, content, None)
            .await
    }

    pub async fn update_artifact_with_metadata(
        &self,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        content: Bytes,
        metadata: Option<EditableArtifactMetaData>,
    ) -> Result<ArtifactMetaData> {
        // Checked before ensure_content: a failed update must not leave
        // the new content behind.
        if !self.store.is_artifact_exists(&self.tenant, group, id) {
            return Err(Error::ArtifactNotFound {
                group: group.to_string(),
                artifact: id.to_string(),
            });
        }
        let hash = self.ensure_content(group, id, &content).await?;
        let outcome = self
            .roundtrip(
                self.artifact_key(group, id),
                ActionType::Update,
                MessagePayload::Artifact {
                    artifact_type: Some(artifact_type),
                    content_hash: Some(hash),
                    metadata,
                },
            )
            .await?;
        expect_meta(outcome)
    }

    /// Delete an artifact and return the removed version numbers. Only
    /// after the delete has resolved, tombstone every dependent key so
    /// the next compaction reclaims their history.
    pub async fn delete_artifact(&self, group: &str, id: &str) -> Result<Vec<i64>> {
        if !self.store.is_artifact_exists(&self.tenant, group, id) {
            return Err(Error::ArtifactNotFound {
                group: group.to_string(),
                artifact: id.to_string(),
            });
        }
        let outcome = self
            .roundtrip(
                self.artifact_key(group, id),
                ActionType::Delete,
                MessagePayload::Artifact {
                    artifact_type: None,
                    content_hash: None,
                    metadata: None,
                },
            )
            .await?;
        let versions = expect_versions(outcome)?;
        for version in &versions {
            self.tombstone(self.version_key(group, id, *version)).await;
        }
        for rule in RuleType::ALL {
            self.tombstone(self.rule_key(group, id, rule)).await;
        }
        Ok(versions)
    }

    pub fn artifact_exists(&self, group: &str, id: &str) -> bool {
        self.store.is_artifact_exists(&self.tenant, group, id)
    }

    pub fn content_exists(&self, content: &[u8]) -> bool {
        self.store
            .is_content_exists(&self.tenant, &content_hash(content))
    }

    // === Artifact reads ===

    pub fn artifact(&self, group: &str, id: &str) -> Result<StoredArtifact> {
        self.store.artifact(&self.tenant, group, id)
    }

    pub fn artifact_by_global_id(&self, global_id: i64) -> Result<StoredArtifact> {
        self.store.artifact_by_global_id(&self.tenant, global_id)
    }

    pub fn artifact_metadata(&self, group: &str, id: &str) -> Result<ArtifactMetaData> {
        self.store.artifact_metadata(&self.tenant, group, id)
    }

    pub fn artifact_metadata_by_global_id(&self, global_id: i64) -> Result<ArtifactMetaData> {
        self.store
            .artifact_metadata_by_global_id(&self.tenant, global_id)
    }

    pub fn artifact_ids(&self, limit: usize) -> Vec<String> {
        self.store.artifact_ids(&self.tenant, limit)
    }

    pub fn versions(&self, group: &str, id: &str) -> Result<Vec<i64>> {
        self.store.versions(&self.tenant, group, id)
    }

    pub fn content_by_hash(&self, hash: &str) -> Result<Bytes> {
        self.store.content_by_hash(&self.tenant, hash)
    }

    pub fn content_by_id(&self, content_id: i64) -> Result<Bytes> {
        self.store.content_by_id(&self.tenant, content_id)
    }

    // === Artifact metadata ===

    /// Update the metadata of an artifact's latest version.
    pub async fn update_artifact_metadata(
        &self,
        group: &str,
        id: &str,
        metadata: EditableArtifactMetaData,
    ) -> Result<()> {
        let latest = self.store.artifact_metadata(&self.tenant, group, id)?;
        ensure_operable(latest.state)?;
        self.roundtrip(
            self.version_key(group, id, latest.version),
            ActionType::Update,
            MessagePayload::Version {
                metadata: Some(metadata),
                state: None,
            },
        )
        .await
        .map(|_| ())
    }

    // === Version lifecycle ===

    pub fn artifact_version(&self, group: &str, id: &str, version: i64) -> Result<StoredArtifact> {
        self.store.artifact_version(&self.tenant, group, id, version)
    }

    pub fn version_metadata(&self, group: &str, id: &str, version: i64) -> Result<VersionMetaData> {
        self.store
            .version_metadata(&self.tenant, group, id, version)
    }

    /// Metadata of the version whose content equals `content`.
    pub fn version_metadata_by_content(
        &self,
        group: &str,
        id: &str,
        content: &[u8],
    ) -> Result<VersionMetaData> {
        self.store
            .version_metadata_by_content(&self.tenant, group, id, content)
    }

    /// Delete one version, then tombstone its key so compaction can
    /// drop the version's whole history.
    pub async fn delete_artifact_version(&self, group: &str, id: &str, version: i64) -> Result<()> {
        self.store
            .version_metadata(&self.tenant, group, id, version)?;
        self.roundtrip(
            self.version_key(group, id, version),
            ActionType::Delete,
            MessagePayload::Version {
                metadata: None,
                state: None,
            },
        )
        .await?;
        self.tombstone(self.version_key(group, id, version)).await;
        Ok(())
    }

    pub async fn update_version_metadata(
        &self,
        group: &str,
        id: &str,
        version: i64,
        metadata: EditableArtifactMetaData,
    ) -> Result<()> {
        let current = self.store.version_metadata(&self.tenant, group, id, version)?;
        ensure_operable(current.state)?;
        self.roundtrip(
            self.version_key(group, id, version),
            ActionType::Update,
            MessagePayload::Version {
                metadata: Some(metadata),
                state: None,
            },
        )
        .await
        .map(|_| ())
    }

    /// Reset a version's metadata fields to their defaults.
    pub async fn clear_version_metadata(&self, group: &str, id: &str, version: i64) -> Result<()> {
        self.store
            .version_metadata(&self.tenant, group, id, version)?;
        self.roundtrip(
            self.version_key(group, id, version),
            ActionType::Clear,
            MessagePayload::Version {
                metadata: None,
                state: None,
            },
        )
        .await
        .map(|_| ())
    }

    /// Move the latest version to a new lifecycle state.
    pub async fn update_artifact_state(
        &self,
        group: &str,
        id: &str,
        state: ArtifactState,
    ) -> Result<()> {
        let latest = self.store.artifact_metadata(&self.tenant, group, id)?;
        self.update_version_state_from(group, id, latest.version, latest.state, state)
            .await
    }

    pub async fn update_version_state(
        &self,
        group: &str,
        id: &str,
        version: i64,
        state: ArtifactState,
    ) -> Result<()> {
        let current = self.store.version_metadata(&self.tenant, group, id, version)?;
        self.update_version_state_from(group, id, version, current.state, state)
            .await
    }

    /// Transitions are validated here, before anything is submitted;
    /// the sink applies whatever state it receives.
    async fn update_version_state_from(
        &self,
        group: &str,
        id: &str,
        version: i64,
        current: ArtifactState,
        target: ArtifactState,
    ) -> Result<()> {
        if !current.validate_transition(target)? {
            tracing::debug!(group, id, version, state = %target, "state unchanged, nothing to submit");
            return Ok(());
        }
        self.roundtrip(
            self.version_key(group, id, version),
            ActionType::Update,
            MessagePayload::Version {
                metadata: None,
                state: Some(target),
            },
        )
        .await
        .map(|_| ())
    }

    // === Search ===

    pub fn search_artifacts(
        &self,
        filters: &[SearchFilter],
        order_by: OrderBy,
        order: OrderDirection,
        offset: usize,
        limit: usize,
    ) -> ArtifactSearchResults {
        self.store
            .search_artifacts(&self.tenant, filters, order_by, order, offset, limit)
    }

    pub fn search_versions(
        &self,
        group: &str,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<VersionSearchResults> {
        self.store
            .search_versions(&self.tenant, group, id, offset, limit)
    }

    // === Artifact rules ===

    pub async fn create_artifact_rule(
        &self,
        group: &str,
        id: &str,
        rule: RuleType,
        config: RuleConfig,
    ) -> Result<()> {
        if self.store.artifact_rule(&self.tenant, group, id, rule).is_ok() {
            return Err(Error::RuleAlreadyExists(rule.to_string()));
        }
        self.roundtrip(
            self.rule_key(group, id, rule),
            ActionType::Create,
            MessagePayload::Rule {
                config: Some(config),
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn update_artifact_rule(
        &self,
        group: &str,
        id: &str,
        rule: RuleType,
        config: RuleConfig,
    ) -> Result<()> {
        self.store.artifact_rule(&self.tenant, group, id, rule)?;
        self.roundtrip(
            self.rule_key(group, id, rule),
            ActionType::Update,
            MessagePayload::Rule {
                config: Some(config),
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_artifact_rule(&self, group: &str, id: &str, rule: RuleType) -> Result<()> {
        self.store.artifact_rule(&self.tenant, group, id, rule)?;
        self.roundtrip(
            self.rule_key(group, id, rule),
            ActionType::Delete,
            MessagePayload::Rule { config: None },
        )
        .await
        .map(|_| ())
    }

    /// Delete every rule configured for an artifact. Rule types that
    /// were never configured are skipped silently.
    pub async fn delete_artifact_rules(&self, group: &str, id: &str) -> Result<()> {
        if !self.store.is_artifact_exists(&self.tenant, group, id) {
            return Err(Error::ArtifactNotFound {
                group: group.to_string(),
                artifact: id.to_string(),
            });
        }
        for rule in RuleType::ALL {
            let result = self
                .roundtrip(
                    self.rule_key(group, id, rule),
                    ActionType::Delete,
                    MessagePayload::Rule { config: None },
                )
                .await;
            swallow_rule_not_found(result)?;
        }
        Ok(())
    }

    pub fn artifact_rules(&self, group: &str, id: &str) -> Result<Vec<RuleType>> {
        self.store.artifact_rules(&self.tenant, group, id)
    }

    pub fn artifact_rule(&self, group: &str, id: &str, rule: RuleType) -> Result<RuleConfig> {
        self.store.artifact_rule(&self.tenant, group, id, rule)
    }

    // === Global rules ===

    pub async fn create_global_rule(&self, rule: RuleType, config: RuleConfig) -> Result<()> {
        self.roundtrip(
            self.global_rule_key(rule),
            ActionType::Create,
            MessagePayload::Rule {
                config: Some(config),
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn update_global_rule(&self, rule: RuleType, config: RuleConfig) -> Result<()> {
        self.store.global_rule(&self.tenant, rule)?;
        self.roundtrip(
            self.global_rule_key(rule),
            ActionType::Update,
            MessagePayload::Rule {
                config: Some(config),
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_global_rule(&self, rule: RuleType) -> Result<()> {
        self.store.global_rule(&self.tenant, rule)?;
        self.roundtrip(
            self.global_rule_key(rule),
            ActionType::Delete,
            MessagePayload::Rule { config: None },
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_global_rules(&self) -> Result<()> {
        for rule in RuleType::ALL {
            let result = self
                .roundtrip(
                    self.global_rule_key(rule),
                    ActionType::Delete,
                    MessagePayload::Rule { config: None },
                )
                .await;
            swallow_rule_not_found(result)?;
        }
        Ok(())
    }

    pub fn global_rules(&self) -> Vec<RuleType> {
        self.store.global_rules(&self.tenant)
    }

    pub fn global_rule(&self, rule: RuleType) -> Result<RuleConfig> {
        self.store.global_rule(&self.tenant, rule)
    }

    // === Groups ===

    /// Delete every artifact in a group.
    pub async fn delete_group(&self, group: &str) -> Result<()> {
        self.roundtrip(self.group_key(group), ActionType::Delete, MessagePayload::Group)
            .await
            .map(|_| ())
    }

    // === Log configuration ===

    pub async fn set_log_config(&self, config: LogConfig) -> Result<()> {
        self.roundtrip(
            self.log_key(&config.logger),
            ActionType::Update,
            MessagePayload::LogConfig {
                level: Some(config.level),
            },
        )
        .await
        .map(|_| ())
    }

    pub async fn remove_log_config(&self, logger: &str) -> Result<()> {
        self.roundtrip(
            self.log_key(logger),
            ActionType::Delete,
            MessagePayload::LogConfig { level: None },
        )
        .await
        .map(|_| ())
    }

    pub fn log_config(&self, logger: &str) -> Result<LogConfig> {
        self.store.log_config(&self.tenant, logger)
    }

    pub fn log_configs(&self) -> Vec<LogConfig> {
        self.store.log_configs(&self.tenant)
    }
}
