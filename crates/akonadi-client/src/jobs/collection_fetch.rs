use akonadi_proto::{Collection, Command, CommandKind, FetchDepth, ListFilter, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Lists collections at or below a base collection.
///
/// The server streams one response per collection and ends the listing
/// with an empty response.
#[derive(Debug, Clone)]
pub struct CollectionFetchJob {
    base: Collection,
    depth: FetchDepth,
    resource: Option<String>,
    mime_types: Vec<String>,
    list_filter: ListFilter,
    fetch_stats: bool,
    collections: Vec<Collection>,
}

impl CollectionFetchJob {
    pub fn new(base: Collection, depth: FetchDepth) -> Self {
        Self {
            base,
            depth,
            resource: None,
            mime_types: Vec::new(),
            list_filter: ListFilter::NoFilter,
            fetch_stats: false,
            collections: Vec::new(),
        }
    }

    /// Only lists collections of this resource.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Only lists collections accepting one of these content types.
    pub fn mime_types(mut self, mime_types: Vec<String>) -> Self {
        self.mime_types = mime_types;
        self
    }

    pub fn list_filter(mut self, filter: ListFilter) -> Self {
        self.list_filter = filter;
        self
    }

    /// Attaches statistics to every fetched collection.
    pub fn include_statistics(mut self, include: bool) -> Self {
        self.fetch_stats = include;
        self
    }
}

impl Job for CollectionFetchJob {
    type Output = Vec<Collection>;

    fn kind(&self) -> CommandKind {
        CommandKind::FetchCollections
    }

    fn build_command(&self) -> Result<Command, JobError> {
        let scope = Scope::from_entity(&self.base)?;
        Ok(Command::FetchCollections {
            scope,
            depth: self.depth,
            resource: self.resource.clone(),
            mime_types: self.mime_types.clone(),
            list_filter: self.list_filter,
            fetch_stats: self.fetch_stats,
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<Vec<Collection>>, JobError> {
        match response {
            Response::FetchCollections {
                collection: Some(collection),
            } => {
                if collection.is_valid() {
                    self.collections.push(collection);
                }
                Ok(JobStep::Continue)
            }
            Response::FetchCollections { collection: None } => {
                Ok(JobStep::Done(std::mem::take(&mut self.collections)))
            }
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filtered_recursive_fetch() {
        let job = CollectionFetchJob::new(Collection::new(0), FetchDepth::Recursive)
            .resource("akonadi_maildir_resource_0")
            .mime_types(vec!["message/rfc822".to_string()])
            .list_filter(ListFilter::Sync)
            .include_statistics(true);

        assert_eq!(
            job.build_command().expect("command"),
            Command::FetchCollections {
                scope: Scope::uid(0),
                depth: FetchDepth::Recursive,
                resource: Some("akonadi_maildir_resource_0".to_string()),
                mime_types: vec!["message/rfc822".to_string()],
                list_filter: ListFilter::Sync,
                fetch_stats: true,
            }
        );
    }

    #[test]
    fn invalid_base_fails_before_sending() {
        let job = CollectionFetchJob::new(Collection::default(), FetchDepth::Base);
        assert!(matches!(job.build_command(), Err(JobError::Unknown(_))));
    }

    #[test]
    fn collects_until_terminator_and_skips_invalid_entries() {
        let mut job = CollectionFetchJob::new(Collection::new(0), FetchDepth::FirstLevel);

        for collection in [Collection::new(1), Collection::new(-1), Collection::new(2)] {
            let step = job
                .handle_response(Response::FetchCollections {
                    collection: Some(collection),
                })
                .expect("response");
            assert_eq!(step, JobStep::Continue);
        }

        let step = job
            .handle_response(Response::FetchCollections { collection: None })
            .expect("terminator");
        assert_eq!(
            step,
            JobStep::Done(vec![Collection::new(1), Collection::new(2)])
        );
    }
}
