use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CollectionId, ItemId, TagId};

/// Item counters for one collection. `-1` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatistics {
    /// Number of items.
    pub count: i64,
    /// Number of items without the seen flag.
    pub unseen: i64,
    /// Accumulated payload size in bytes.
    pub size: i64,
}

impl Default for CollectionStatistics {
    fn default() -> Self {
        Self {
            count: -1,
            unseen: -1,
            size: -1,
        }
    }
}

/// A folder-like container of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    /// Resource-side identifier.
    #[serde(default)]
    pub remote_id: Option<String>,
    /// Parent collection, invalid for top-level collections.
    #[serde(default)]
    pub parent: CollectionId,
    #[serde(default)]
    pub name: String,
    /// Owning resource identifier.
    #[serde(default)]
    pub resource: Option<String>,
    /// Content mime types this collection accepts.
    #[serde(default)]
    pub mime_types: Vec<String>,
    /// Present when statistics were requested with the fetch.
    #[serde(default)]
    pub statistics: Option<CollectionStatistics>,
}

impl Collection {
    pub fn new(id: i64) -> Self {
        Self {
            id: CollectionId(id),
            ..Self::default()
        }
    }

    pub fn with_remote_id(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

/// A single PIM object stored in a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub remote_id: Option<String>,
    /// Globally unique identifier derived from the payload.
    #[serde(default)]
    pub gid: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Server-side change counter; `None` when unknown.
    #[serde(default)]
    pub revision: Option<i64>,
    /// Resource-side change marker.
    #[serde(default)]
    pub remote_revision: Option<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Payload size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub payload: Option<Vec<u8>>,
}

impl Item {
    pub fn new(id: i64) -> Self {
        Self {
            id: ItemId(id),
            ..Self::default()
        }
    }

    pub fn with_remote_id(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            ..Self::default()
        }
    }

    /// Sets the payload and its size.
    pub fn with_payload(mut self, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        self.mime_type = Some(mime_type.into());
        self.size = payload.len() as u64;
        self.payload = Some(payload);
        self
    }
}

/// A user-visible label attached to items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: TagId,
    #[serde(default)]
    pub gid: Option<String>,
    #[serde(default)]
    pub remote_id: Option<String>,
    /// Tag category, e.g. `PLAIN`.
    #[serde(default)]
    pub tag_type: Option<String>,
}

impl TagInfo {
    pub fn new(id: i64) -> Self {
        Self {
            id: TagId(id),
            ..Self::default()
        }
    }
}
