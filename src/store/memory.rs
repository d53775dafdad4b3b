//! In-memory registry store
//!
//! One `Mutex<Inner>` guards all state. Writes arrive from a single
//! dispatch task in journal order, so the lock is never contended on
//! the write side; reads take it briefly to clone small values out.
//!
//! Id assignment (global ids, content ids, version numbers) happens
//! here, during apply. Because every node applies the same records in
//! the same order, every node assigns the same ids.

use crate::common::hash::content_hash;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::model::{
    ArtifactMetaData, ArtifactSearchResults, ArtifactState, ArtifactType,
    EditableArtifactMetaData, LogConfig, OrderBy, OrderDirection, RuleConfig, RuleType,
    SearchFilter, SearchedArtifact, SearchedVersion, StoredArtifact, VersionMetaData,
    VersionSearchResults,
};
use super::RegistryStore;

fn millis(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts).unwrap_or(DateTime::UNIX_EPOCH)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ArtifactKey {
    tenant: String,
    group: String,
    id: String,
}

impl ArtifactKey {
    fn new(tenant: &str, group: &str, id: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            group: group.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct VersionRow {
    version: i64,
    global_id: i64,
    content_id: i64,
    content_hash: String,
    state: ArtifactState,
    name: Option<String>,
    description: Option<String>,
    labels: Vec<String>,
    properties: HashMap<String, String>,
    created_on: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ArtifactRow {
    artifact_type: ArtifactType,
    created_on: DateTime<Utc>,
    modified_on: DateTime<Utc>,
    // Version numbers count up for the lifetime of the artifact row
    // and are never reused after a version delete.
    next_version: i64,
    versions: std::collections::BTreeMap<i64, VersionRow>,
    rules: HashMap<RuleType, RuleConfig>,
}

#[derive(Debug, Clone)]
struct GlobalRef {
    group: String,
    id: String,
    version: i64,
}

#[derive(Debug, Default)]
struct Inner {
    // (tenant, content hash) -> row; rows are shared between versions
    // and survive artifact deletes
    contents: HashMap<(String, String), ContentRow>,
    content_ids: HashMap<(String, i64), String>,
    artifacts: HashMap<ArtifactKey, ArtifactRow>,
    global_ids: HashMap<(String, i64), GlobalRef>,
    global_rules: HashMap<(String, RuleType), RuleConfig>,
    log_configs: HashMap<(String, String), LogConfig>,
    next_global_id: i64,
    next_content_id: i64,
}

#[derive(Debug, Clone)]
struct ContentRow {
    content_id: i64,
    content: Bytes,
}

/// In-memory [`RegistryStore`], rebuilt from the journal on startup.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_global_id: 1,
                next_content_id: 1,
                ..Inner::default()
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// === Row -> DTO conversions ===

fn to_version_meta(artifact_type: ArtifactType, row: &VersionRow) -> VersionMetaData {
    VersionMetaData {
        version: row.version,
        global_id: row.global_id,
        content_id: row.content_id,
        artifact_type,
        state: row.state,
        name: row.name.clone(),
        description: row.description.clone(),
        labels: row.labels.clone(),
        properties: row.properties.clone(),
        created_on: row.created_on,
    }
}

fn to_artifact_meta(key: &ArtifactKey, art: &ArtifactRow, row: &VersionRow) -> ArtifactMetaData {
    ArtifactMetaData {
        group: key.group.clone(),
        id: key.id.clone(),
        artifact_type: art.artifact_type,
        version: row.version,
        global_id: row.global_id,
        content_id: row.content_id,
        state: row.state,
        name: row.name.clone(),
        description: row.description.clone(),
        labels: row.labels.clone(),
        properties: row.properties.clone(),
        created_on: art.created_on,
        modified_on: art.modified_on,
    }
}

impl Inner {
    fn artifact_row(&self, key: &ArtifactKey) -> Result<&ArtifactRow> {
        self.artifacts.get(key).ok_or_else(|| Error::ArtifactNotFound {
            group: key.group.clone(),
            artifact: key.id.clone(),
        })
    }

    fn artifact_row_mut(&mut self, key: &ArtifactKey) -> Result<&mut ArtifactRow> {
        self.artifacts
            .get_mut(key)
            .ok_or_else(|| Error::ArtifactNotFound {
                group: key.group.clone(),
                artifact: key.id.clone(),
            })
    }

    fn version_row<'a>(art: &'a ArtifactRow, key: &ArtifactKey, version: i64) -> Result<&'a VersionRow> {
        art.versions.get(&version).ok_or_else(|| Error::VersionNotFound {
            group: key.group.clone(),
            artifact: key.id.clone(),
            version,
        })
    }

    /// Highest surviving version of an artifact.
    fn latest_row<'a>(art: &'a ArtifactRow, key: &ArtifactKey) -> Result<&'a VersionRow> {
        art.versions
            .values()
            .next_back()
            .ok_or_else(|| Error::ArtifactNotFound {
                group: key.group.clone(),
                artifact: key.id.clone(),
            })
    }

    fn stored(&self, key: &ArtifactKey, row: &VersionRow) -> Result<StoredArtifact> {
        let content = self
            .contents
            .get(&(key.tenant.clone(), row.content_hash.clone()))
            .map(|c| c.content.clone())
            .ok_or_else(|| Error::ContentNotFound(row.content_hash.clone()))?;
        Ok(StoredArtifact {
            version: row.version,
            global_id: row.global_id,
            content_id: row.content_id,
            content,
        })
    }

    fn global_ref(&self, tenant: &str, global_id: i64) -> Result<(ArtifactKey, GlobalRef)> {
        let gref = self
            .global_ids
            .get(&(tenant.to_string(), global_id))
            .cloned()
            .ok_or_else(|| Error::ContentNotFound(format!("global id {}", global_id)))?;
        let key = ArtifactKey::new(tenant, &gref.group, &gref.id);
        Ok((key, gref))
    }

    fn remove_artifact(&mut self, key: &ArtifactKey) -> Result<Vec<i64>> {
        let art = self.artifacts.remove(key).ok_or_else(|| Error::ArtifactNotFound {
            group: key.group.clone(),
            artifact: key.id.clone(),
        })?;
        let versions: Vec<i64> = art.versions.keys().copied().collect();
        for row in art.versions.values() {
            self.global_ids
                .remove(&(key.tenant.clone(), row.global_id));
        }
        Ok(versions)
    }
}

fn filter_matches(filter: &SearchFilter, id: &str, row: &VersionRow, group: &str) -> bool {
    let contains = |haystack: &Option<String>, needle: &str| {
        haystack
            .as_deref()
            .map(|h| h.to_lowercase().contains(needle))
            .unwrap_or(false)
    };
    match filter {
        SearchFilter::Name(s) => {
            let needle = s.to_lowercase();
            contains(&row.name, &needle) || id.to_lowercase().contains(&needle)
        }
        SearchFilter::Description(s) => contains(&row.description, &s.to_lowercase()),
        SearchFilter::Label(s) => {
            let needle = s.to_lowercase();
            row.labels.iter().any(|l| l.to_lowercase() == needle)
        }
        SearchFilter::Group(s) => group == s,
        SearchFilter::Everything(s) => {
            let needle = s.to_lowercase();
            contains(&row.name, &needle)
                || contains(&row.description, &needle)
                || id.to_lowercase().contains(&needle)
                || row.labels.iter().any(|l| l.to_lowercase() == needle)
        }
    }
}

impl RegistryStore for MemoryStore {
    // === Existence probes ===

    fn is_artifact_exists(&self, tenant: &str, group: &str, id: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.artifacts.contains_key(&ArtifactKey::new(tenant, group, id))
    }

    fn is_content_exists(&self, tenant: &str, hash: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .contents
            .contains_key(&(tenant.to_string(), hash.to_string()))
    }

    // === Content reads ===

    fn content_by_hash(&self, tenant: &str, hash: &str) -> Result<Bytes> {
        let inner = self.inner.lock().unwrap();
        inner
            .contents
            .get(&(tenant.to_string(), hash.to_string()))
            .map(|c| c.content.clone())
            .ok_or_else(|| Error::ContentNotFound(hash.to_string()))
    }

    fn content_by_id(&self, tenant: &str, content_id: i64) -> Result<Bytes> {
        let inner = self.inner.lock().unwrap();
        let hash = inner
            .content_ids
            .get(&(tenant.to_string(), content_id))
            .cloned()
            .ok_or_else(|| Error::ContentNotFound(format!("content id {}", content_id)))?;
        inner
            .contents
            .get(&(tenant.to_string(), hash.clone()))
            .map(|c| c.content.clone())
            .ok_or(Error::ContentNotFound(hash))
    }

    // === Artifact reads ===

    fn artifact_ids(&self, tenant: &str, limit: usize) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let ids: BTreeSet<String> = inner
            .artifacts
            .keys()
            .filter(|k| k.tenant == tenant)
            .map(|k| k.id.clone())
            .collect();
        ids.into_iter().take(limit).collect()
    }

    fn artifact(&self, tenant: &str, group: &str, id: &str) -> Result<StoredArtifact> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        let row = Inner::latest_row(art, &key)?;
        inner.stored(&key, row)
    }

    fn artifact_by_global_id(&self, tenant: &str, global_id: i64) -> Result<StoredArtifact> {
        let inner = self.inner.lock().unwrap();
        let (key, gref) = inner.global_ref(tenant, global_id)?;
        let art = inner.artifact_row(&key)?;
        let row = Inner::version_row(art, &key, gref.version)?;
        inner.stored(&key, row)
    }

    fn artifact_version(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<StoredArtifact> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        let row = Inner::version_row(art, &key, version)?;
        inner.stored(&key, row)
    }

    fn artifact_metadata(&self, tenant: &str, group: &str, id: &str) -> Result<ArtifactMetaData> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        let row = Inner::latest_row(art, &key)?;
        Ok(to_artifact_meta(&key, art, row))
    }

    fn artifact_metadata_by_global_id(
        &self,
        tenant: &str,
        global_id: i64,
    ) -> Result<ArtifactMetaData> {
        let inner = self.inner.lock().unwrap();
        let (key, gref) = inner.global_ref(tenant, global_id)?;
        let art = inner.artifact_row(&key)?;
        let row = Inner::version_row(art, &key, gref.version)?;
        Ok(to_artifact_meta(&key, art, row))
    }

    fn version_metadata(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<VersionMetaData> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        let row = Inner::version_row(art, &key, version)?;
        Ok(to_version_meta(art.artifact_type, row))
    }

    fn version_metadata_by_content(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        content: &[u8],
    ) -> Result<VersionMetaData> {
        let hash = content_hash(content);
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        // Newest matching version wins.
        art.versions
            .values()
            .rev()
            .find(|row| row.content_hash == hash)
            .map(|row| to_version_meta(art.artifact_type, row))
            .ok_or_else(|| Error::VersionNotFound {
                group: group.to_string(),
                artifact: id.to_string(),
                version: -1,
            })
    }

    fn versions(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<i64>> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        Ok(art.versions.keys().copied().collect())
    }

    // === Search ===

    fn search_artifacts(
        &self,
        tenant: &str,
        filters: &[SearchFilter],
        order_by: OrderBy,
        order: OrderDirection,
        offset: usize,
        limit: usize,
    ) -> ArtifactSearchResults {
        let inner = self.inner.lock().unwrap();
        let mut matched: Vec<SearchedArtifact> = Vec::new();
        for (key, art) in inner.artifacts.iter().filter(|(k, _)| k.tenant == tenant) {
            let row = match art.versions.values().next_back() {
                Some(row) => row,
                None => continue,
            };
            if filters
                .iter()
                .all(|f| filter_matches(f, &key.id, row, &key.group))
            {
                matched.push(SearchedArtifact {
                    group: key.group.clone(),
                    id: key.id.clone(),
                    artifact_type: art.artifact_type,
                    state: row.state,
                    name: row.name.clone(),
                    description: row.description.clone(),
                    labels: row.labels.clone(),
                    created_on: art.created_on,
                    modified_on: art.modified_on,
                });
            }
        }
        matched.sort_by(|a, b| {
            let ord = match order_by {
                OrderBy::Name => {
                    let an = a.name.as_deref().unwrap_or(&a.id).to_lowercase();
                    let bn = b.name.as_deref().unwrap_or(&b.id).to_lowercase();
                    an.cmp(&bn)
                }
                OrderBy::CreatedOn => a.created_on.cmp(&b.created_on),
            };
            // Tie-break on (group, id) so paging is stable.
            let ord = ord.then_with(|| (&a.group, &a.id).cmp(&(&b.group, &b.id)));
            match order {
                OrderDirection::Ascending => ord,
                OrderDirection::Descending => ord.reverse(),
            }
        });
        let count = matched.len();
        let artifacts = matched.into_iter().skip(offset).take(limit).collect();
        ArtifactSearchResults { artifacts, count }
    }

    fn search_versions(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<VersionSearchResults> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        let count = art.versions.len();
        let versions = art
            .versions
            .values()
            .skip(offset)
            .take(limit)
            .map(|row| SearchedVersion {
                version: row.version,
                global_id: row.global_id,
                artifact_type: art.artifact_type,
                state: row.state,
                name: row.name.clone(),
                description: row.description.clone(),
                created_on: row.created_on,
            })
            .collect();
        Ok(VersionSearchResults { versions, count })
    }

    // === Rule reads ===

    fn artifact_rules(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<RuleType>> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        Ok(RuleType::ALL
            .into_iter()
            .filter(|r| art.rules.contains_key(r))
            .collect())
    }

    fn artifact_rule(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
    ) -> Result<RuleConfig> {
        let inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row(&key)?;
        art.rules
            .get(&rule)
            .cloned()
            .ok_or_else(|| Error::RuleNotFound(rule.to_string()))
    }

    fn global_rules(&self, tenant: &str) -> Vec<RuleType> {
        let inner = self.inner.lock().unwrap();
        RuleType::ALL
            .into_iter()
            .filter(|r| inner.global_rules.contains_key(&(tenant.to_string(), *r)))
            .collect()
    }

    fn global_rule(&self, tenant: &str, rule: RuleType) -> Result<RuleConfig> {
        let inner = self.inner.lock().unwrap();
        inner
            .global_rules
            .get(&(tenant.to_string(), rule))
            .cloned()
            .ok_or_else(|| Error::RuleNotFound(rule.to_string()))
    }

    // === Log configuration reads ===

    fn log_config(&self, tenant: &str, logger: &str) -> Result<LogConfig> {
        let inner = self.inner.lock().unwrap();
        inner
            .log_configs
            .get(&(tenant.to_string(), logger.to_string()))
            .cloned()
            .ok_or_else(|| Error::LogConfigNotFound(logger.to_string()))
    }

    fn log_configs(&self, tenant: &str) -> Vec<LogConfig> {
        let inner = self.inner.lock().unwrap();
        let mut configs: Vec<LogConfig> = inner
            .log_configs
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, c)| c.clone())
            .collect();
        configs.sort_by(|a, b| a.logger.cmp(&b.logger));
        configs
    }

    // === Apply methods ===

    fn apply_content(&self, tenant: &str, hash: &str, content: Bytes) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        let key = (tenant.to_string(), hash.to_string());
        if let Some(row) = inner.contents.get(&key) {
            return Ok(row.content_id);
        }
        let content_id = inner.next_content_id;
        inner.next_content_id += 1;
        inner.contents.insert(key, ContentRow { content_id, content });
        inner
            .content_ids
            .insert((tenant.to_string(), content_id), hash.to_string());
        Ok(content_id)
    }

    fn apply_version(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        artifact_type: ArtifactType,
        hash: &str,
        metadata: Option<EditableArtifactMetaData>,
        first_version: bool,
        timestamp: i64,
    ) -> Result<ArtifactMetaData> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let now = millis(timestamp);

        let content_id = inner
            .contents
            .get(&(tenant.to_string(), hash.to_string()))
            .map(|c| c.content_id)
            .ok_or_else(|| Error::ContentNotFound(hash.to_string()))?;

        if first_version {
            if inner.artifacts.contains_key(&key) {
                return Err(Error::ArtifactAlreadyExists {
                    group: group.to_string(),
                    artifact: id.to_string(),
                });
            }
            inner.artifacts.insert(
                key.clone(),
                ArtifactRow {
                    artifact_type,
                    created_on: now,
                    modified_on: now,
                    next_version: 1,
                    versions: Default::default(),
                    rules: Default::default(),
                },
            );
        } else if !inner.artifacts.contains_key(&key) {
            return Err(Error::ArtifactNotFound {
                group: group.to_string(),
                artifact: id.to_string(),
            });
        }

        let global_id = inner.next_global_id;
        inner.next_global_id += 1;

        let meta = metadata.unwrap_or_default();
        let art = inner.artifacts.get_mut(&key).ok_or_else(|| {
            Error::Internal("artifact row vanished during apply".to_string())
        })?;
        let version = art.next_version;
        art.next_version += 1;
        art.modified_on = now;
        let row = VersionRow {
            version,
            global_id,
            content_id,
            content_hash: hash.to_string(),
            state: ArtifactState::Active,
            name: meta.name,
            description: meta.description,
            labels: meta.labels,
            properties: meta.properties,
            created_on: now,
        };
        art.versions.insert(version, row);

        let art = inner.artifact_row(&key)?;
        let row = Inner::version_row(art, &key, version)?;
        let result = to_artifact_meta(&key, art, row);
        inner.global_ids.insert(
            (tenant.to_string(), global_id),
            GlobalRef {
                group: group.to_string(),
                id: id.to_string(),
                version,
            },
        );
        Ok(result)
    }

    fn apply_artifact_delete(&self, tenant: &str, group: &str, id: &str) -> Result<Vec<i64>> {
        let mut inner = self.inner.lock().unwrap();
        inner.remove_artifact(&ArtifactKey::new(tenant, group, id))
    }

    fn apply_version_delete(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        let row = art.versions.remove(&version).ok_or_else(|| Error::VersionNotFound {
            group: group.to_string(),
            artifact: id.to_string(),
            version,
        })?;
        let empty = art.versions.is_empty();
        inner.global_ids.remove(&(tenant.to_string(), row.global_id));
        if empty {
            inner.artifacts.remove(&key);
        }
        Ok(())
    }

    fn apply_version_metadata(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
        metadata: EditableArtifactMetaData,
        timestamp: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        let row = art.versions.get_mut(&version).ok_or_else(|| Error::VersionNotFound {
            group: group.to_string(),
            artifact: id.to_string(),
            version,
        })?;
        row.name = metadata.name;
        row.description = metadata.description;
        row.labels = metadata.labels;
        row.properties = metadata.properties;
        art.modified_on = millis(timestamp);
        Ok(())
    }

    fn apply_version_metadata_clear(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        let row = art.versions.get_mut(&version).ok_or_else(|| Error::VersionNotFound {
            group: group.to_string(),
            artifact: id.to_string(),
            version,
        })?;
        row.name = None;
        row.description = None;
        row.labels.clear();
        row.properties.clear();
        Ok(())
    }

    fn apply_version_state(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        version: i64,
        state: ArtifactState,
        timestamp: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        let row = art.versions.get_mut(&version).ok_or_else(|| Error::VersionNotFound {
            group: group.to_string(),
            artifact: id.to_string(),
            version,
        })?;
        row.state = state;
        art.modified_on = millis(timestamp);
        Ok(())
    }

    fn apply_group_delete(&self, tenant: &str, group: &str) -> Result<Vec<(String, Vec<i64>)>> {
        let mut inner = self.inner.lock().unwrap();
        let mut keys: Vec<ArtifactKey> = inner
            .artifacts
            .keys()
            .filter(|k| k.tenant == tenant && k.group == group)
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(Error::GroupNotFound(group.to_string()));
        }
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            let versions = inner.remove_artifact(&key)?;
            removed.push((key.id, versions));
        }
        Ok(removed)
    }

    fn apply_artifact_rule(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
        config: RuleConfig,
        create: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        if create && art.rules.contains_key(&rule) {
            return Err(Error::RuleAlreadyExists(rule.to_string()));
        }
        if !create && !art.rules.contains_key(&rule) {
            return Err(Error::RuleNotFound(rule.to_string()));
        }
        art.rules.insert(rule, config);
        Ok(())
    }

    fn apply_artifact_rule_delete(
        &self,
        tenant: &str,
        group: &str,
        id: &str,
        rule: RuleType,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = ArtifactKey::new(tenant, group, id);
        let art = inner.artifact_row_mut(&key)?;
        art.rules
            .remove(&rule)
            .map(|_| ())
            .ok_or_else(|| Error::RuleNotFound(rule.to_string()))
    }

    fn apply_global_rule(
        &self,
        tenant: &str,
        rule: RuleType,
        config: RuleConfig,
        create: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (tenant.to_string(), rule);
        if create && inner.global_rules.contains_key(&key) {
            return Err(Error::RuleAlreadyExists(rule.to_string()));
        }
        if !create && !inner.global_rules.contains_key(&key) {
            return Err(Error::RuleNotFound(rule.to_string()));
        }
        inner.global_rules.insert(key, config);
        Ok(())
    }

    fn apply_global_rule_delete(&self, tenant: &str, rule: RuleType) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .global_rules
            .remove(&(tenant.to_string(), rule))
            .map(|_| ())
            .ok_or_else(|| Error::RuleNotFound(rule.to_string()))
    }

    fn apply_log_config(&self, tenant: &str, config: LogConfig) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .log_configs
            .insert((tenant.to_string(), config.logger.clone()), config);
        Ok(())
    }

    fn apply_log_config_delete(&self, tenant: &str, logger: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .log_configs
            .remove(&(tenant.to_string(), logger.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::LogConfigNotFound(logger.to_string()))
    }
}
