//! Journal message model
//!
//! Every mutation travels through the journal as a (key, value) pair.
//! The key identifies the affected entity and decides both the target
//! partition and the compaction slot: two mutations of the same entity
//! always encode to byte-equal keys. The value carries the action, its
//! payload and, when a caller is waiting, the correlation id.
//!
//! Tombstones are journal records whose value is absent entirely, so
//! they never appear as a [`MessageValue`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::model::{
    ArtifactState, ArtifactType, EditableArtifactMetaData, LogLevel, RuleConfig, RuleType,
};
use crate::Result;

/// What a message does to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    /// Reset metadata fields to their defaults (versions only).
    Clear,
}

/// Identity of the entity a message mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MessageKey {
    Content {
        tenant: String,
        content_hash: String,
    },
    Group {
        tenant: String,
        group: String,
    },
    Artifact {
        tenant: String,
        group: String,
        id: String,
    },
    ArtifactRule {
        tenant: String,
        group: String,
        id: String,
        rule: RuleType,
    },
    ArtifactVersion {
        tenant: String,
        group: String,
        id: String,
        version: i64,
    },
    GlobalRule {
        tenant: String,
        rule: RuleType,
    },
    LogConfig {
        tenant: String,
        logger: String,
    },
}

impl MessageKey {
    /// Routing key for partition selection.
    ///
    /// All messages that touch one artifact (the artifact itself, its
    /// versions, its rules) share a routing key, so the journal applies
    /// them in submission order. Tenant-wide entities route by tenant.
    /// Content records override this at the submit site and ride the
    /// referencing artifact's routing key instead; their compaction
    /// identity stays the hash.
    pub fn partition_key(&self) -> String {
        match self {
            MessageKey::Content {
                tenant,
                content_hash,
            } => format!("{}/{}", tenant, content_hash),
            MessageKey::Group { tenant, group } => format!("{}/{}", tenant, group),
            MessageKey::Artifact {
                tenant, group, id, ..
            }
            | MessageKey::ArtifactRule {
                tenant, group, id, ..
            }
            | MessageKey::ArtifactVersion {
                tenant, group, id, ..
            } => format!("{}/{}/{}", tenant, group, id),
            MessageKey::GlobalRule { tenant, .. } | MessageKey::LogConfig { tenant, .. } => {
                tenant.clone()
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Action-specific payload. Fields not meaningful for an action are
/// simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity")]
pub enum MessagePayload {
    Content {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Vec<u8>>,
    },
    Group,
    Artifact {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artifact_type: Option<ArtifactType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_hash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<EditableArtifactMetaData>,
    },
    Version {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<EditableArtifactMetaData>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<ArtifactState>,
    },
    Rule {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<RuleConfig>,
    },
    LogConfig {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<LogLevel>,
    },
}

/// Value side of a journal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageValue {
    pub action: ActionType,
    /// Present when a caller blocks on this message's outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Uuid>,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

impl MessageValue {
    pub fn new(action: ActionType, correlation: Option<Uuid>, payload: MessagePayload) -> Self {
        Self {
            action,
            correlation,
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
