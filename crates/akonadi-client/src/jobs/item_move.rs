use akonadi_proto::{Collection, Command, CommandKind, Item, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Moves items into a target collection.
#[derive(Debug, Clone)]
pub struct ItemMoveJob {
    items: Vec<Item>,
    target: Collection,
}

impl ItemMoveJob {
    pub fn new(items: Vec<Item>, target: Collection) -> Self {
        Self { items, target }
    }
}

impl Job for ItemMoveJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::MoveItems
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let items = Scope::from_entities(&self.items)?;
        Ok(Command::MoveItems {
            items,
            destination: Scope::from_entity(&self.target)?,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::MoveItems {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_without_shared_identifier_are_rejected() {
        let job = ItemMoveJob::new(
            vec![Item::new(4), Item::with_remote_id("msg-7")],
            Collection::new(1),
        );
        // Neither all ids nor all remote ids are known.
        let err = job.build_command().expect_err("mixed identifiers");
        assert!(matches!(err, JobError::Unknown(_)));
    }

    #[test]
    fn moves_items_by_remote_id() {
        let job = ItemMoveJob::new(
            vec![Item::with_remote_id("a"), Item::with_remote_id("b")],
            Collection::new(1),
        );
        assert_eq!(
            job.build_command().expect("command"),
            Command::MoveItems {
                items: Scope::Rid(vec!["a".to_string(), "b".to_string()]),
                destination: Scope::uid(1),
            }
        );
    }
}
