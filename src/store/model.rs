//! Domain types for the registry
//!
//! These are the values the facade returns and the sink writes. They
//! carry no tenant field; tenancy lives in the message keys and store
//! indexes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema format of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactType {
    Avro,
    Protobuf,
    Json,
    OpenApi,
    AsyncApi,
    GraphQL,
    Wsdl,
    Xsd,
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactType::Avro => "AVRO",
            ArtifactType::Protobuf => "PROTOBUF",
            ArtifactType::Json => "JSON",
            ArtifactType::OpenApi => "OPENAPI",
            ArtifactType::AsyncApi => "ASYNCAPI",
            ArtifactType::GraphQL => "GRAPHQL",
            ArtifactType::Wsdl => "WSDL",
            ArtifactType::Xsd => "XSD",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an artifact version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArtifactState {
    Active,
    Deprecated,
    Disabled,
    Deleted,
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactState::Active => "ACTIVE",
            ArtifactState::Deprecated => "DEPRECATED",
            ArtifactState::Disabled => "DISABLED",
            ArtifactState::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

/// Legal lifecycle transitions. Any non-deleted state may move to any
/// other state; Deleted is terminal.
static TRANSITIONS: Lazy<HashMap<ArtifactState, Vec<ArtifactState>>> = Lazy::new(|| {
    use ArtifactState::*;
    let mut map = HashMap::new();
    map.insert(Active, vec![Deprecated, Disabled, Deleted]);
    map.insert(Deprecated, vec![Active, Disabled, Deleted]);
    map.insert(Disabled, vec![Active, Deprecated, Deleted]);
    map.insert(Deleted, vec![]);
    map
});

impl ArtifactState {
    /// States in which a version still accepts metadata updates.
    pub const OPERABLE: [ArtifactState; 3] = [
        ArtifactState::Active,
        ArtifactState::Deprecated,
        ArtifactState::Disabled,
    ];

    pub fn can_transition_to(self, to: ArtifactState) -> bool {
        TRANSITIONS
            .get(&self)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// Validate a requested transition before it is submitted to the
    /// journal. `Ok(false)` means the version already has the requested
    /// state and no message should be sent at all.
    pub fn validate_transition(self, to: ArtifactState) -> crate::Result<bool> {
        if self == to {
            return Ok(false);
        }
        if !self.can_transition_to(to) {
            return Err(crate::Error::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        Ok(true)
    }
}

/// Validation/compatibility policy category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleType {
    Validity,
    Compatibility,
}

impl RuleType {
    /// Every rule type; bulk deletes and tombstone cascades iterate this.
    pub const ALL: [RuleType; 2] = [RuleType::Validity, RuleType::Compatibility];
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleType::Validity => "VALIDITY",
            RuleType::Compatibility => "COMPATIBILITY",
        };
        write!(f, "{}", s)
    }
}

/// Rule configuration (e.g. "BACKWARD" for a compatibility rule)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub configuration: String,
}

impl RuleConfig {
    pub fn new(configuration: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
        }
    }
}

/// Log level for a named logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Per-logger level override, distributed to every node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub logger: String,
    pub level: LogLevel,
}

/// Caller-editable subset of version metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableArtifactMetaData {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Metadata of an artifact, as of one version (usually the latest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetaData {
    pub group: String,
    pub id: String,
    pub artifact_type: ArtifactType,
    pub version: i64,
    pub global_id: i64,
    pub content_id: i64,
    pub state: ArtifactState,
    pub name: Option<String>,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub properties: HashMap<String, String>,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

/// Metadata of one artifact version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetaData {
    pub version: i64,
    pub global_id: i64,
    pub content_id: i64,
    pub artifact_type: ArtifactType,
    pub state: ArtifactState,
    pub name: Option<String>,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub properties: HashMap<String, String>,
    pub created_on: DateTime<Utc>,
}

/// A stored artifact version with its content bytes
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub version: i64,
    pub global_id: i64,
    pub content_id: i64,
    pub content: Bytes,
}

/// One artifact search criterion; an artifact matches a query when it
/// matches every filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// Substring match on the artifact name (falls back to the id)
    Name(String),
    /// Substring match on the description
    Description(String),
    /// Exact label match
    Label(String),
    /// Exact group match
    Group(String),
    /// Substring match on name, id, description or any label
    Everything(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Name,
    CreatedOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// One artifact row in a search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchedArtifact {
    pub group: String,
    pub id: String,
    pub artifact_type: ArtifactType,
    pub state: ArtifactState,
    pub name: Option<String>,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

/// Paged artifact search results; `count` is the total number of
/// matches before paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSearchResults {
    pub artifacts: Vec<SearchedArtifact>,
    pub count: usize,
}

/// One version row in a version search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchedVersion {
    pub version: i64,
    pub global_id: i64,
    pub artifact_type: ArtifactType,
    pub state: ArtifactState,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_on: DateTime<Utc>,
}

/// Paged version search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSearchResults {
    pub versions: Vec<SearchedVersion>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use ArtifactState::*;

        assert!(Active.can_transition_to(Deprecated));
        assert!(Active.can_transition_to(Deleted));
        assert!(Disabled.can_transition_to(Active));
        assert!(Deprecated.can_transition_to(Disabled));

        // Deleted is terminal
        assert!(!Deleted.can_transition_to(Active));
        assert!(!Deleted.can_transition_to(Deprecated));
    }

    #[test]
    fn test_validate_transition() {
        use ArtifactState::*;

        // Same state is a no-op, not an error
        assert_eq!(Active.validate_transition(Active).unwrap(), false);
        assert_eq!(Active.validate_transition(Disabled).unwrap(), true);

        let err = Deleted.validate_transition(Active).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ArtifactType::Avro).unwrap();
        assert_eq!(json, "\"AVRO\"");
        let json = serde_json::to_string(&ArtifactState::Deprecated).unwrap();
        assert_eq!(json, "\"DEPRECATED\"");
        let json = serde_json::to_string(&RuleType::Compatibility).unwrap();
        assert_eq!(json, "\"COMPATIBILITY\"");
    }
}
