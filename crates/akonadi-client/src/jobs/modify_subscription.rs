use akonadi_proto::{Command, CommandKind, Response, SubscriptionChange};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Sends a subscription delta for a notification bus.
#[derive(Debug, Clone)]
pub struct ModifySubscriptionJob {
    change: SubscriptionChange,
}

impl ModifySubscriptionJob {
    pub fn new(change: SubscriptionChange) -> Self {
        Self { change }
    }
}

impl Job for ModifySubscriptionJob {
    type Output = ();

    fn kind(&self) -> CommandKind {
        CommandKind::ModifySubscription
    }

    fn local_result(&mut self) -> Option<()> {
        self.change.is_empty().then_some(())
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::ModifySubscription {
            change: self.change.clone(),
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<()>, JobError> {
        match response {
            Response::ModifySubscription {} => Ok(JobStep::Done(())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}
