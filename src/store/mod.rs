//! Node-local materialized registry state
//!
//! Every node holds a full copy of the registry state, rebuilt from the
//! journal on startup. All writes go through [`RegistryStore`] apply
//! methods and are performed by a single task (the dispatch loop), in
//! journal order; reads may come from any thread. Implementations must
//! therefore be `Send + Sync`, but never see concurrent writers.

pub mod memory;
pub mod model;

pub use memory::MemoryStore;
pub use model::{
    ArtifactMetaData, ArtifactSearchResults, ArtifactState, ArtifactType,
    EditableArtifactMetaData, LogConfig, LogLevel, OrderBy, OrderDirection, RuleConfig, RuleType,
    SearchFilter, SearchedArtifact, SearchedVersion, StoredArtifact, VersionMetaData,
    VersionSearchResults,
};

use crate::Result;
use bytes::Bytes;

/// Tenant id used when no explicit tenant is configured.
pub const DEFAULT_TENANT: &str = "_";

/// Materialized registry state of one node.
///
/// The `apply_*` methods mutate state and are reserved for the journal
/// sink; calling them from anywhere else breaks the deterministic-replay
/// guarantee. Everything else is a read.
pub trait RegistryStore: Send + Sync {
    // === Existence probes ===

    fn is_artifact_exists(&self, tenant: &str, group: &str, id: &str) -> bool;
    fn is_content_exists(&self, tenant: &str, content_hash: &str) -> bool;

    // === Content reads ===

    fn content_by_hash(&self, tenant: &str, content_hash: &str) -> Result<Bytes>;
    fn content_by_id(&self, tenant: &str, content_id: i64) -> Result<Bytes>;

    // === Artifact reads ===

    /// Ids of every artifact, across all groups, up to `limit`.
    fn artifact_ids(&self, tenant: &str, limit: usize) -> Vec<String>;

    /// Latest version of an artifact with its content.
    fn artifact(&self, tenant: &str, group: &str, id: &str) -> Result<StoredArtifact>;
    fn artifact_by_global_id(&self, tenant: &str, global_id: i64) -> Result<StoredArtifact>;
    fn artifact_version(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<StoredArtifact>;

    fn artifact_metadata(&self, tenant: &str, group: &str, id: &str) -> Result<ArtifactMetaData>;
    fn artifact_metadata_by_global_id(
        &self,
        tenant: &str,
        global_id: i64,
    ) -> Result<ArtifactMetaData>;
    fn version_metadata(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<VersionMetaData>;
    /// Metadata of the version whose content bytes match `content` exactly.
    fn version_metadata_by_content(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        content: &[u8],
    ) -> Result<VersionMetaData>;

    /// Version numbers of an artifact, ascending.
    fn versions(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<i64>>;

    // === Search ===

    fn search_artifacts(
        &self,
        tenant: &str,
        filters: &[SearchFilter],
        order_by: OrderBy,
        order: OrderDirection,
        offset: usize,
        limit: usize,
    ) -> ArtifactSearchResults;
    fn search_versions(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<VersionSearchResults>;

    // === Rule reads ===

    fn artifact_rules(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<RuleType>>;
    fn artifact_rule(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
    ) -> Result<RuleConfig>;
    fn global_rules(&self, tenant: &str) -> Vec<RuleType>;
    fn global_rule(&self, tenant: &str, rule: RuleType) -> Result<RuleConfig>;

    // === Log configuration reads ===

    fn log_config(&self, tenant: &str, logger: &str) -> Result<LogConfig>;
    fn log_configs(&self, tenant: &str) -> Vec<LogConfig>;

    // === Apply methods (journal sink only) ===

    /// Store content under its hash and assign a content id. Applying
    /// the same hash twice returns the already-assigned id.
    fn apply_content(&self, tenant: &str, content_hash: &str, content: Bytes) -> Result<i64>;

    /// Create an artifact with its first version, or add a version to
    /// an existing artifact when `first_version` is false. Assigns the
    /// global id and the version number. `timestamp` is the journal
    /// record timestamp in epoch millis, so replicas assign identical
    /// creation times.
    #[allow(clippy::too_many_arguments)]
    fn apply_version(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        content_hash: &str,
        metadata: Option<EditableArtifactMetaData>,
        first_version: bool,
        timestamp: i64,
    ) -> Result<ArtifactMetaData>;

    /// Remove an artifact and all its versions; returns the removed
    /// version numbers, ascending.
    fn apply_artifact_delete(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<i64>>;

    /// Remove a single version. Removing the last version removes the
    /// artifact itself.
    fn apply_version_delete(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<()>;

    fn apply_version_metadata(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
        metadata: EditableArtifactMetaData,
        timestamp: i64,
    ) -> Result<()>;
    fn apply_version_metadata_clear(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<()>;
    fn apply_version_state(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
        state: ArtifactState,
        timestamp: i64,
    ) -> Result<()>;

    /// Remove every artifact in a group; returns the removed artifact
    /// ids with their version numbers.
    fn apply_group_delete(&self, tenant: &str, group: &str) -> Result<Vec<(String, Vec<i64>)>>;

    fn apply_artifact_rule(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
        config: RuleConfig,
        create: bool,
    ) -> Result<()>;
    fn apply_artifact_rule_delete(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
    ) -> Result<()>;
    fn apply_global_rule(
        &self,
        tenant: &str,
        rule: RuleType,
        config: RuleConfig,
        create: bool,
    ) -> Result<()>;
    fn apply_global_rule_delete(&self, tenant: &str, rule: RuleType) -> Result<()>;

    fn apply_log_config(&self, tenant: &str, config: LogConfig) -> Result<()>;
    fn apply_log_config_delete(&self, tenant: &str, logger: &str) -> Result<()>;
}
