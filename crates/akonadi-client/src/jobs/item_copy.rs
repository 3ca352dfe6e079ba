use akonadi_proto::{Collection, Command, CommandKind, Item, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Copies items into a target collection.
#[derive(Debug, Clone)]
pub struct ItemCopyJob {
    items: Vec<Item>,
    target: Collection,
}

impl ItemCopyJob {
    pub fn new(items: Vec<Item>, target: Collection) -> Self {
        Self { items, target }
    }
}

impl Job for ItemCopyJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::CopyItems
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::CopyItems {
            items: Scope::from_entities(&self.items)?,
            destination: Scope::from_entity(&self.target)?,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::CopyItems {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_items_by_id() {
        let job = ItemCopyJob::new(vec![Item::new(1), Item::new(2)], Collection::new(9));
        assert_eq!(
            job.build_command().expect("command"),
            Command::CopyItems {
                items: Scope::Uid(vec![1, 2]),
                destination: Scope::uid(9),
            }
        );
    }

    #[test]
    fn nothing_to_copy_is_rejected() {
        let job = ItemCopyJob::new(Vec::new(), Collection::new(9));
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }
}
