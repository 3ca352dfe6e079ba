use akonadi_proto::{Command, CommandKind, Response, Scope, TagInfo};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Lists tags, either all of them or a given set.
#[derive(Debug, Clone, Default)]
pub struct TagFetchJob {
    tags: Option<Vec<TagInfo>>,
    fetched: Vec<TagInfo>,
}

impl TagFetchJob {
    /// Fetches every tag known to the server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches only these tags.
    pub fn for_tags(tags: Vec<TagInfo>) -> Self {
        Self {
            tags: Some(tags),
            fetched: Vec::new(),
        }
    }
}

impl Job for TagFetchJob {
    type Output = Vec<TagInfo>;

    fn kind(&self) -> CommandKind {
        CommandKind::FetchTags
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let scope = match &self.tags {
            Some(tags) => Some(Scope::from_entities(tags)?),
            None => None,
        };
        Ok(Command::FetchTags { scope })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<Vec<TagInfo>>, JobError> {
        match response {
            Response::FetchTags { tag: Some(tag) } => {
                self.fetched.push(tag);
                Ok(JobStep::Continue)
            }
            Response::FetchTags { tag: None } => Ok(JobStep::Done(std::mem::take(&mut self.fetched))),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}
