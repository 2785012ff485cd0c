use std::collections::HashMap;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::remote::{RemoteCategory, RemoteUser};

/// A record that lives in a persisted, append-mostly catalog.
///
/// Each implementation decides its natural key, which remote records it
/// accepts and what happens when a remote record matches an existing entry.
pub trait CatalogRecord: Serialize + DeserializeOwned + Clone {
    type Key: Eq + Hash + Clone + std::fmt::Debug + std::fmt::Display;
    type Remote: DeserializeOwned;

    /// Collection name, used for logging and the API endpoint.
    const COLLECTION: &'static str;

    fn key(&self) -> Self::Key;

    fn remote_key(remote: &Self::Remote) -> Self::Key;

    fn from_remote(remote: &Self::Remote) -> Self;

    /// Whether a remote record may enter the catalog at all.
    fn admits(_remote: &Self::Remote) -> bool {
        true
    }

    /// Applies the merge policy to an existing record. Returns true if the
    /// record changed.
    fn refresh(&mut self, _remote: &Self::Remote) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub id: String,
    pub name: String,
    pub remote_id: u64,
}

impl CatalogRecord for AuthorRecord {
    type Key = u64;
    type Remote = RemoteUser;

    const COLLECTION: &'static str = "users";

    fn key(&self) -> u64 {
        self.remote_id
    }

    fn remote_key(remote: &RemoteUser) -> u64 {
        remote.id
    }

    fn from_remote(remote: &RemoteUser) -> Self {
        Self {
            id: remote.slug.clone(),
            name: remote.name.clone(),
            remote_id: remote.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub remote_id: u64,
}

impl CatalogRecord for CategoryRecord {
    type Key = String;
    type Remote = RemoteCategory;

    const COLLECTION: &'static str = "categories";

    fn key(&self) -> String {
        self.id.clone()
    }

    fn remote_key(remote: &RemoteCategory) -> String {
        remote.slug.clone()
    }

    fn from_remote(remote: &RemoteCategory) -> Self {
        Self {
            id: remote.slug.clone(),
            name: remote.name.clone(),
            description: remote.description.clone(),
            remote_id: remote.id,
        }
    }

    fn admits(remote: &RemoteCategory) -> bool {
        remote.count > 0
    }

    fn refresh(&mut self, remote: &RemoteCategory) -> bool {
        let changed = self.remote_id != remote.id;
        self.remote_id = remote.id;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Skipped,
    Refreshed,
    Filtered,
}

/// Insertion-ordered catalog with a key index.
///
/// Existing entries keep their position; new entries are appended in arrival
/// order. If a persisted file holds duplicate keys, every entry is kept and
/// the first one wins lookups.
#[derive(Debug, Clone)]
pub struct Catalog<R: CatalogRecord> {
    records: Vec<R>,
    index: HashMap<R::Key, usize>,
}

impl<R: CatalogRecord> Default for Catalog<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CatalogRecord> Catalog<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_records(records: Vec<R>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            index.entry(record.key()).or_insert(position);
        }
        Self { records, index }
    }

    pub fn merge_remote(&mut self, remote: &R::Remote) -> MergeOutcome {
        if !R::admits(remote) {
            return MergeOutcome::Filtered;
        }
        let key = R::remote_key(remote);
        if let Some(&position) = self.index.get(&key) {
            return if self.records[position].refresh(remote) {
                MergeOutcome::Refreshed
            } else {
                MergeOutcome::Skipped
            };
        }
        self.index.insert(key, self.records.len());
        self.records.push(R::from_remote(remote));
        MergeOutcome::Inserted
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.index.get(key).map(|&position| &self.records[position])
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
