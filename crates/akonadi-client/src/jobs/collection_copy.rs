use akonadi_proto::{Collection, Command, CommandKind, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Copies a collection and everything below it into a target collection.
#[derive(Debug, Clone)]
pub struct CollectionCopyJob {
    source: Collection,
    target: Collection,
}

impl CollectionCopyJob {
    pub fn new(source: Collection, target: Collection) -> Self {
        Self { source, target }
    }
}

impl Job for CollectionCopyJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::CopyCollection
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::CopyCollection {
            source: Scope::from_entity(&self.source)?,
            destination: Scope::from_entity(&self.target)?,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::CopyCollection {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_source_by_remote_id_when_id_is_unknown() {
        let job = CollectionCopyJob::new(Collection::with_remote_id("INBOX"), Collection::new(7));
        assert_eq!(
            job.build_command().expect("command"),
            Command::CopyCollection {
                source: Scope::Rid(vec!["INBOX".to_string()]),
                destination: Scope::uid(7),
            }
        );
    }

    #[test]
    fn unaddressable_target_is_rejected() {
        let job = CollectionCopyJob::new(Collection::new(3), Collection::default());
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }
}
