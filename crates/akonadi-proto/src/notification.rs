use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CollectionId, SessionId};

/// Kind of entity a change notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Items,
    Collections,
    Tags,
}

/// What happened to the entities of a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Modify,
    ModifyFlags,
    ModifyTags,
    Move,
    Remove,
    Link,
    Unlink,
    Subscribe,
    Unsubscribe,
}

/// Reference to one changed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl EntityRef {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            remote_id: None,
            mime_type: None,
        }
    }
}

/// Server-pushed description of a change to stored entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Session whose command caused the change.
    pub session: SessionId,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub entities: Vec<EntityRef>,
    /// Collection the entities live in, or lived in before a move.
    #[serde(default)]
    pub parent_collection: Option<CollectionId>,
    /// Destination collection of a move or link.
    #[serde(default)]
    pub parent_dest_collection: Option<CollectionId>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub destination_resource: Option<String>,
    #[serde(default)]
    pub changed_parts: BTreeSet<String>,
    #[serde(default)]
    pub added_flags: BTreeSet<String>,
    #[serde(default)]
    pub removed_flags: BTreeSet<String>,
}

impl ChangeNotification {
    pub fn new(
        session: SessionId,
        entity_type: EntityType,
        operation: Operation,
        entities: Vec<EntityRef>,
    ) -> Self {
        Self {
            session,
            entity_type,
            operation,
            entities,
            parent_collection: None,
            parent_dest_collection: None,
            resource: None,
            destination_resource: None,
            changed_parts: BTreeSet::new(),
            added_flags: BTreeSet::new(),
            removed_flags: BTreeSet::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.entities.is_empty()
    }
}

/// Incremental change to what a notification bus is told about.
///
/// Removing an id also drops it from the pending additions, so a change
/// never asks the server to add and remove the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChange {
    #[serde(default)]
    pub added_collections: BTreeSet<i64>,
    #[serde(default)]
    pub removed_collections: BTreeSet<i64>,
    #[serde(default)]
    pub added_items: BTreeSet<i64>,
    #[serde(default)]
    pub removed_items: BTreeSet<i64>,
    #[serde(default)]
    pub added_mime_types: BTreeSet<String>,
    #[serde(default)]
    pub removed_mime_types: BTreeSet<String>,
    #[serde(default)]
    pub added_resources: BTreeSet<String>,
    #[serde(default)]
    pub removed_resources: BTreeSet<String>,
    #[serde(default)]
    pub ignored_sessions: BTreeSet<SessionId>,
    #[serde(default)]
    pub unignored_sessions: BTreeSet<SessionId>,
}

impl SubscriptionChange {
    pub fn monitor_collection(mut self, id: CollectionId) -> Self {
        self.added_collections.insert(id.0);
        self
    }

    pub fn unmonitor_collection(mut self, id: CollectionId) -> Self {
        self.added_collections.remove(&id.0);
        self.removed_collections.insert(id.0);
        self
    }

    pub fn monitor_item(mut self, id: i64) -> Self {
        self.added_items.insert(id);
        self
    }

    pub fn unmonitor_item(mut self, id: i64) -> Self {
        self.added_items.remove(&id);
        self.removed_items.insert(id);
        self
    }

    pub fn monitor_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.added_mime_types.insert(mime_type.into());
        self
    }

    pub fn unmonitor_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        self.added_mime_types.remove(&mime_type);
        self.removed_mime_types.insert(mime_type);
        self
    }

    pub fn monitor_resource(mut self, resource: impl Into<String>) -> Self {
        self.added_resources.insert(resource.into());
        self
    }

    pub fn unmonitor_resource(mut self, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        self.added_resources.remove(&resource);
        self.removed_resources.insert(resource);
        self
    }

    pub fn ignore_session(mut self, session: SessionId) -> Self {
        self.ignored_sessions.insert(session);
        self
    }

    pub fn unignore_session(mut self, session: SessionId) -> Self {
        self.ignored_sessions.remove(&session);
        self.unignored_sessions.insert(session);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added_collections.is_empty()
            && self.removed_collections.is_empty()
            && self.added_items.is_empty()
            && self.removed_items.is_empty()
            && self.added_mime_types.is_empty()
            && self.removed_mime_types.is_empty()
            && self.added_resources.is_empty()
            && self.removed_resources.is_empty()
            && self.ignored_sessions.is_empty()
            && self.unignored_sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_cancels_pending_addition() {
        let change = SubscriptionChange::default()
            .monitor_collection(CollectionId(4))
            .monitor_collection(CollectionId(5))
            .unmonitor_collection(CollectionId(4));

        assert_eq!(change.added_collections, BTreeSet::from([5]));
        assert_eq!(change.removed_collections, BTreeSet::from([4]));
    }

    #[test]
    fn empty_change_is_detected() {
        assert!(SubscriptionChange::default().is_empty());
        assert!(
            !SubscriptionChange::default()
                .ignore_session(SessionId::from("indexer"))
                .is_empty()
        );
    }

    #[test]
    fn notification_without_entities_is_invalid() {
        let notification = ChangeNotification::new(
            SessionId::from("s"),
            EntityType::Items,
            Operation::Add,
            Vec::new(),
        );
        assert!(!notification.is_valid());
    }
}
