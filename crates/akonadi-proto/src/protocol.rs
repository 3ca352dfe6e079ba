use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;

use crate::{
    ChangeNotification, Collection, CollectionStatistics, ItemId, ProtocolError, Scope, SessionId,
    SubscriptionChange, Tag, TagInfo,
};

/// Wire protocol version spoken by this client.
pub const PROTOCOL_VERSION: u32 = 3;

/// Client-to-server frame: a tagged command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope<T> {
    /// Client-allocated correlation tag.
    pub tag: Tag,
    /// Typed command payload.
    pub body: T,
}

/// Server-to-client frame: a tagged response or unsolicited message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Tag of the command being answered, or [`Tag::UNSOLICITED`].
    pub tag: Tag,
    /// Typed response payload.
    pub body: T,
}

/// Type discriminator shared by commands and the responses answering them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Hello,
    Login,
    Logout,
    FetchCollectionStats,
    FetchCollections,
    CopyCollection,
    MoveCollection,
    CopyItems,
    MoveItems,
    CreateItem,
    ModifyItems,
    FetchTags,
    DeleteTag,
    ModifySubscription,
    ChangeNotification,
}

/// Role a connection logs in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginKind {
    /// Regular command session.
    Client,
    /// Session that only receives change notifications.
    NotificationBus,
}

/// How far below the base collection a fetch descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchDepth {
    /// Only the base collection.
    #[default]
    Base,
    /// Direct children of the base collection.
    FirstLevel,
    /// All descendants of the base collection.
    Recursive,
}

/// Server-side preference filter applied to fetched collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListFilter {
    #[default]
    NoFilter,
    Display,
    Sync,
    Index,
    Enabled,
}

/// Commands sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Authenticates the connection under a session name.
    Login {
        session: SessionId,
        kind: LoginKind,
    },
    /// Ends the session.
    Logout {},
    /// Requests item counters of one collection.
    FetchCollectionStats {
        collection: Scope,
    },
    /// Lists collections below a base scope.
    FetchCollections {
        scope: Scope,
        depth: FetchDepth,
        /// Restricts results to one resource.
        resource: Option<String>,
        /// Restricts results to collections accepting any of these types.
        mime_types: Vec<String>,
        list_filter: ListFilter,
        /// Attaches statistics to every returned collection.
        fetch_stats: bool,
    },
    /// Copies a collection with its content below a destination.
    CopyCollection {
        source: Scope,
        destination: Scope,
    },
    /// Moves a collection below a destination.
    MoveCollection {
        source: Scope,
        destination: Scope,
    },
    /// Copies items into a destination collection.
    CopyItems {
        items: Scope,
        destination: Scope,
    },
    /// Moves items into a destination collection.
    MoveItems {
        items: Scope,
        destination: Scope,
    },
    /// Stores a new item in a collection.
    CreateItem {
        collection: Scope,
        mime_type: String,
        remote_id: Option<String>,
        remote_revision: Option<String>,
        flags: BTreeSet<String>,
        size: u64,
        payload: Option<Vec<u8>>,
    },
    /// Changes stored items.
    ModifyItems {
        items: Scope,
        /// Revision the change is based on; `None` skips the conflict check.
        revision: Option<i64>,
        changes: ItemChanges,
    },
    /// Lists tags; no scope means every tag.
    FetchTags {
        scope: Option<Scope>,
    },
    /// Deletes tags.
    DeleteTag {
        tags: Scope,
    },
    /// Adjusts what a notification bus is told about.
    ModifySubscription {
        change: SubscriptionChange,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Login { .. } => CommandKind::Login,
            Command::Logout {} => CommandKind::Logout,
            Command::FetchCollectionStats { .. } => CommandKind::FetchCollectionStats,
            Command::FetchCollections { .. } => CommandKind::FetchCollections,
            Command::CopyCollection { .. } => CommandKind::CopyCollection,
            Command::MoveCollection { .. } => CommandKind::MoveCollection,
            Command::CopyItems { .. } => CommandKind::CopyItems,
            Command::MoveItems { .. } => CommandKind::MoveItems,
            Command::CreateItem { .. } => CommandKind::CreateItem,
            Command::ModifyItems { .. } => CommandKind::ModifyItems,
            Command::FetchTags { .. } => CommandKind::FetchTags,
            Command::DeleteTag { .. } => CommandKind::DeleteTag,
            Command::ModifySubscription { .. } => CommandKind::ModifySubscription,
        }
    }
}

/// Item fields a modify command touches. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanges {
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub remote_revision: Option<String>,
    /// Replaces every flag; takes precedence over the added and removed sets.
    #[serde(default)]
    pub flags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub added_flags: BTreeSet<String>,
    #[serde(default)]
    pub removed_flags: BTreeSet<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub payload: Option<Vec<u8>>,
    /// Drops the cached payload on the server.
    #[serde(default)]
    pub invalidate_cache: bool,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Revision an item reached after a modify command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRevision {
    pub id: ItemId,
    pub revision: i64,
}

/// Responses and unsolicited messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Greeting sent right after the socket is accepted.
    Hello {
        /// Server name.
        server: String,
        /// Free-form greeting.
        message: String,
        /// Protocol version spoken by the server.
        protocol: u32,
    },
    /// Login accepted.
    Login {},
    /// Logout accepted.
    Logout {},
    FetchCollectionStats {
        stats: CollectionStatistics,
    },
    /// One fetched collection, or `None` once the listing is complete.
    FetchCollections {
        collection: Option<Collection>,
    },
    CopyCollection {},
    MoveCollection {},
    CopyItems {},
    MoveItems {},
    /// Id the server assigned to a created item.
    CreateItem {
        id: ItemId,
    },
    /// New revisions of the modified items.
    ModifyItems {
        revisions: Vec<ItemRevision>,
    },
    /// One fetched tag, or `None` once the listing is complete.
    FetchTags {
        tag: Option<TagInfo>,
    },
    DeleteTag {},
    ModifySubscription {},
    /// Change pushed to notification bus sessions.
    ChangeNotification {
        notification: ChangeNotification,
    },
    /// Failure answering a command of the given kind.
    Error {
        kind: CommandKind,
        error: ProtocolError,
    },
}

impl Response {
    pub fn kind(&self) -> CommandKind {
        match self {
            Response::Hello { .. } => CommandKind::Hello,
            Response::Login {} => CommandKind::Login,
            Response::Logout {} => CommandKind::Logout,
            Response::FetchCollectionStats { .. } => CommandKind::FetchCollectionStats,
            Response::FetchCollections { .. } => CommandKind::FetchCollections,
            Response::CopyCollection {} => CommandKind::CopyCollection,
            Response::MoveCollection {} => CommandKind::MoveCollection,
            Response::CopyItems {} => CommandKind::CopyItems,
            Response::MoveItems {} => CommandKind::MoveItems,
            Response::CreateItem { .. } => CommandKind::CreateItem,
            Response::ModifyItems { .. } => CommandKind::ModifyItems,
            Response::FetchTags { .. } => CommandKind::FetchTags,
            Response::DeleteTag {} => CommandKind::DeleteTag,
            Response::ModifySubscription {} => CommandKind::ModifySubscription,
            Response::ChangeNotification { .. } => CommandKind::ChangeNotification,
            Response::Error { kind, .. } => *kind,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
