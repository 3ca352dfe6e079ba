use akonadi_proto::{Collection, Command, CommandKind, Item, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Stores a new item in a collection.
///
/// Completes with the item as sent, carrying the id the server assigned.
#[derive(Debug, Clone)]
pub struct ItemCreateJob {
    item: Item,
    collection: Collection,
}

impl ItemCreateJob {
    pub fn new(item: Item, collection: Collection) -> Self {
        Self { item, collection }
    }
}

impl Job for ItemCreateJob {
    type Output = Item;

    fn kind(&self) -> CommandKind {
        CommandKind::CreateItem
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let mime_type = self
            .item
            .mime_type
            .clone()
            .filter(|mime_type| !mime_type.is_empty())
            .ok_or_else(|| JobError::Unknown("item has no mime type".to_string()))?;

        Ok(Command::CreateItem {
            collection: Scope::from_entity(&self.collection)?,
            mime_type,
            remote_id: self.item.remote_id.clone(),
            remote_revision: self.item.remote_revision.clone(),
            flags: self.item.flags.clone(),
            size: self.item.size,
            payload: self.item.payload.clone(),
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<Item>, JobError> {
        match response {
            Response::CreateItem { id } if id.is_valid() => {
                let mut item = self.item.clone();
                item.id = id;
                item.revision = Some(0);
                Ok(JobStep::Done(item))
            }
            Response::CreateItem { id } => Err(JobError::Unknown(format!(
                "server assigned invalid item id {id}"
            ))),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use akonadi_proto::ItemId;

    use super::*;

    fn note() -> Item {
        let mut item = Item::with_remote_id("note-1").with_payload("text/plain", b"hello".to_vec());
        item.flags.insert("\\Seen".to_string());
        item
    }

    #[test]
    fn sends_item_fields_to_the_target_collection() {
        let job = ItemCreateJob::new(note(), Collection::new(4));
        match job.build_command().expect("command") {
            Command::CreateItem {
                collection,
                mime_type,
                remote_id,
                flags,
                size,
                payload,
                ..
            } => {
                assert_eq!(collection, Scope::uid(4));
                assert_eq!(mime_type, "text/plain");
                assert_eq!(remote_id.as_deref(), Some("note-1"));
                assert!(flags.contains("\\Seen"));
                assert_eq!(size, 5);
                assert_eq!(payload, Some(b"hello".to_vec()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn item_without_mime_type_is_rejected() {
        let job = ItemCreateJob::new(Item::default(), Collection::new(4));
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }

    #[test]
    fn invalid_target_is_rejected() {
        let job = ItemCreateJob::new(note(), Collection::default());
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }

    #[test]
    fn assigned_id_lands_on_the_item() {
        let mut job = ItemCreateJob::new(note(), Collection::new(4));
        let step = job
            .handle_response(Response::CreateItem { id: ItemId(77) })
            .expect("response");
        let JobStep::Done(item) = step else {
            panic!("create must finish on the first response");
        };
        assert_eq!(item.id, ItemId(77));
        assert_eq!(item.revision, Some(0));
        assert_eq!(item.remote_id.as_deref(), Some("note-1"));

        assert!(matches!(
            job.handle_response(Response::CreateItem { id: ItemId::INVALID }),
            Err(JobError::Unknown(_))
        ));
    }
}
