pub mod entities;
pub mod errors;
pub mod ids;
pub mod notification;
pub mod paths;
pub mod protocol;
pub mod scope;

pub use entities::{Collection, CollectionStatistics, Item, TagInfo};
pub use errors::{ErrorCode, ProtocolError, ScopeError};
pub use ids::{CollectionId, ItemId, SessionId, Tag, TagAllocator, TagId};
pub use notification::{ChangeNotification, EntityRef, EntityType, Operation, SubscriptionChange};
pub use paths::default_socket_path;
pub use protocol::{
    Command, CommandEnvelope, CommandKind, FetchDepth, ItemChanges, ItemRevision, ListFilter,
    LoginKind, PROTOCOL_VERSION, Response, ResponseEnvelope,
};
pub use scope::{Scope, ScopeEntity};
