use akonadi_proto::{Collection, CollectionStatistics, Command, CommandKind, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Fetches item counters of one collection.
#[derive(Debug, Clone)]
pub struct CollectionStatisticsJob {
    collection: Collection,
}

impl CollectionStatisticsJob {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }
}

impl Job for CollectionStatisticsJob {
    type Output = CollectionStatistics;

    fn kind(&self) -> CommandKind {
        CommandKind::FetchCollectionStats
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::FetchCollectionStats {
            collection: Scope::from_entity(&self.collection)?,
        })
    }

    fn handle_response(
        &mut self,
        response: Response,
    ) -> Result<JobStep<CollectionStatistics>, JobError> {
        match response {
            Response::FetchCollectionStats { stats } => Ok(JobStep::Done(stats)),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_collection_fails_before_sending() {
        let job = CollectionStatisticsJob::new(Collection::new(-1));
        let err = job.build_command().expect_err("invalid collection must fail");
        assert!(matches!(err, JobError::Unknown(_)));
    }

    #[test]
    fn stats_response_completes() {
        let mut job = CollectionStatisticsJob::new(Collection::new(12));
        assert_eq!(
            job.build_command().expect("command"),
            Command::FetchCollectionStats {
                collection: Scope::uid(12)
            }
        );

        let stats = CollectionStatistics {
            count: 10,
            unseen: 2,
            size: 4096,
        };
        let step = job
            .handle_response(Response::FetchCollectionStats { stats })
            .expect("response");
        assert_eq!(step, JobStep::Done(stats));
    }
}
