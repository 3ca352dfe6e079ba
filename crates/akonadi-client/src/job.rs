use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use akonadi_proto::{Command, CommandKind, Response, Tag};
use tokio::sync::oneshot;

use crate::JobError;

/// Progress of a job after one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStep<T> {
    /// More responses for the same tag are expected.
    Continue,
    /// The job is complete.
    Done(T),
}

/// One request/response exchange with the server.
///
/// A job builds exactly one command and consumes the responses carrying its
/// tag until it reports [`JobStep::Done`]. Error responses and responses of
/// another kind never reach [`Job::handle_response`]; they end the job with
/// [`JobError::Server`] or [`JobError::UnexpectedResponse`].
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    /// Response kind this job waits for.
    fn kind(&self) -> CommandKind;

    /// Result of a job with nothing to send. `Some` completes the job
    /// without contacting the server.
    fn local_result(&mut self) -> Option<Self::Output> {
        None
    }

    /// Builds the command to send. An error completes the job unsent.
    fn build_command(&self) -> Result<Command, JobError>;

    fn handle_response(&mut self, response: Response) -> Result<JobStep<Self::Output>, JobError>;
}

/// Type-erased job owned by the session while it waits for responses.
pub(crate) trait PendingJob: Send {
    fn kind(&self) -> CommandKind;

    /// Feeds one response; returns true once the job has completed.
    fn on_response(&mut self, response: Response) -> bool;

    fn fail(self: Box<Self>, error: JobError);
}

pub(crate) struct JobRunner<J: Job> {
    job: J,
    done: Option<oneshot::Sender<Result<J::Output, JobError>>>,
}

impl<J: Job> JobRunner<J> {
    pub(crate) fn new(job: J, tag: Tag) -> (Self, JobHandle<J::Output>) {
        let (tx, rx) = oneshot::channel();
        let handle = JobHandle { tag: Some(tag), rx };
        (Self { job, done: Some(tx) }, handle)
    }

    fn complete(&mut self, result: Result<J::Output, JobError>) {
        if let Some(done) = self.done.take() {
            // The caller may have dropped the handle; nothing to report then.
            let _ = done.send(result);
        }
    }
}

impl<J: Job> PendingJob for JobRunner<J> {
    fn kind(&self) -> CommandKind {
        self.job.kind()
    }

    fn on_response(&mut self, response: Response) -> bool {
        let expected = self.job.kind();
        let result = match response {
            Response::Error { error, .. } => Err(JobError::from(error)),
            other if other.kind() != expected => Err(JobError::UnexpectedResponse {
                expected,
                actual: other.kind(),
            }),
            other => match self.job.handle_response(other) {
                Ok(JobStep::Continue) => return false,
                Ok(JobStep::Done(output)) => Ok(output),
                Err(err) => Err(err),
            },
        };
        self.complete(result);
        true
    }

    fn fail(mut self: Box<Self>, error: JobError) {
        self.complete(Err(error));
    }
}

/// Completion of a started job.
///
/// Await it from async code, or call [`JobHandle::wait_blocking`] from a
/// plain thread.
#[derive(Debug)]
pub struct JobHandle<T> {
    tag: Option<Tag>,
    rx: oneshot::Receiver<Result<T, JobError>>,
}

impl<T> JobHandle<T> {
    /// Handle of a job that finished without touching the wire.
    pub(crate) fn ready(result: Result<T, JobError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { tag: None, rx }
    }

    /// Tag the job's command was sent with; `None` when nothing was sent.
    pub fn tag(&self) -> Option<Tag> {
        self.tag
    }

    /// Blocks the current thread until the job completes.
    ///
    /// Panics when called from within an async runtime worker.
    pub fn wait_blocking(self) -> Result<T, JobError> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(JobError::SessionClosed))
    }
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T, JobError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(JobError::SessionClosed)))
    }
}

/// Error for a response that passed the kind check but has the wrong shape.
pub(crate) fn unexpected(expected: CommandKind, response: &Response) -> JobError {
    JobError::UnexpectedResponse {
        expected,
        actual: response.kind(),
    }
}
