use akonadi_proto::{Collection, Command, CommandKind, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Reparents a collection under a target collection.
#[derive(Debug, Clone)]
pub struct CollectionMoveJob {
    collection: Collection,
    target: Collection,
}

impl CollectionMoveJob {
    pub fn new(collection: Collection, target: Collection) -> Self {
        Self { collection, target }
    }
}

impl Job for CollectionMoveJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::MoveCollection
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let source = Scope::from_entity(&self.collection)?;
        let destination = Scope::from_entity(&self.target)?;
        Ok(Command::MoveCollection {
            source,
            destination,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::MoveCollection {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_source_is_rejected() {
        let job = CollectionMoveJob::new(Collection::new(-1), Collection::new(2));
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }

    #[test]
    fn acknowledgement_completes() {
        let mut job = CollectionMoveJob::new(Collection::new(5), Collection::new(2));
        assert_eq!(
            job.handle_response(Response::MoveCollection {}),
            Ok(JobStep::Done(()))
        );
    }
}
