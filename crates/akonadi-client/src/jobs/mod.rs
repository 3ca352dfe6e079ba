//! Concrete jobs, one per protocol command.

mod collection_copy;
mod collection_fetch;
mod collection_move;
mod collection_statistics;
mod item_copy;
mod item_create;
mod item_modify;
mod item_move;
mod modify_subscription;
mod tag_delete;
mod tag_fetch;

pub use collection_copy::CollectionCopyJob;
pub use collection_fetch::CollectionFetchJob;
pub use collection_move::CollectionMoveJob;
pub use collection_statistics::CollectionStatisticsJob;
pub use item_copy::ItemCopyJob;
pub use item_create::ItemCreateJob;
pub use item_modify::ItemModifyJob;
pub use item_move::ItemMoveJob;
pub use modify_subscription::ModifySubscriptionJob;
pub use tag_delete::TagDeleteJob;
pub use tag_fetch::TagFetchJob;
