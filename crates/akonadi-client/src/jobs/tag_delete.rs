use akonadi_proto::{Command, CommandKind, Response, Scope, TagInfo};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Deletes tags and detaches them from every item.
#[derive(Debug, Clone)]
pub struct TagDeleteJob {
    tags: Vec<TagInfo>,
}

impl TagDeleteJob {
    pub fn new(tags: Vec<TagInfo>) -> Self {
        Self { tags }
    }
}

impl Job for TagDeleteJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::DeleteTag
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::DeleteTag {
            tags: Scope::from_entities(&self.tags)?,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::DeleteTag {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletes_by_id() {
        let job = TagDeleteJob::new(vec![TagInfo::new(8)]);
        assert_eq!(
            job.build_command().expect("command"),
            Command::DeleteTag {
                tags: Scope::uid(8)
            }
        );
    }

    #[test]
    fn unidentified_tag_is_rejected() {
        let job = TagDeleteJob::new(vec![TagInfo::default()]);
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }
}
