use akonadi_proto::{Command, CommandKind, Item, ItemChanges, Response, Scope};

use crate::{Job, JobError, JobStep, job::unexpected};

/// Changes stored items.
///
/// A single item is modified against the revision it carries; the server
/// rejects the change with [`akonadi_proto::ErrorCode::Conflict`] when the
/// item moved on in the meantime. Completes with the items and their new
/// revisions. A job without any change completes without contacting the
/// server.
#[derive(Debug, Clone)]
pub struct ItemModifyJob {
    items: Vec<Item>,
    changes: ItemChanges,
    revision_check: bool,
}

impl ItemModifyJob {
    /// Writes back the remote id, remote revision and payload of `item`.
    pub fn new(item: Item) -> Self {
        let changes = ItemChanges {
            remote_id: item.remote_id.clone(),
            remote_revision: item.remote_revision.clone(),
            size: item.payload.as_ref().map(|_| item.size),
            payload: item.payload.clone(),
            ..ItemChanges::default()
        };
        Self {
            items: vec![item],
            changes,
            revision_check: true,
        }
    }

    /// Applies the same flag or cache change to many items at once.
    /// No revision check is done.
    pub fn for_items(items: Vec<Item>) -> Self {
        Self {
            items,
            changes: ItemChanges::default(),
            revision_check: false,
        }
    }

    /// Replaces every flag of the items.
    pub fn set_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes.flags = Some(flags.into_iter().map(Into::into).collect());
        self.changes.added_flags.clear();
        self.changes.removed_flags.clear();
        self
    }

    pub fn add_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        match &mut self.changes.flags {
            Some(flags) => {
                flags.insert(flag);
            }
            None => {
                self.changes.removed_flags.remove(&flag);
                self.changes.added_flags.insert(flag);
            }
        }
        self
    }

    pub fn remove_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        match &mut self.changes.flags {
            Some(flags) => {
                flags.remove(&flag);
            }
            None => {
                self.changes.added_flags.remove(&flag);
                self.changes.removed_flags.insert(flag);
            }
        }
        self
    }

    /// Drops the server's cached payload so it is fetched from the resource again.
    pub fn invalidate_cache(mut self) -> Self {
        self.changes.invalidate_cache = true;
        self
    }

    /// Applies the change whatever the item's current server revision is.
    pub fn disable_revision_check(mut self) -> Self {
        self.revision_check = false;
        self
    }

    fn base_revision(&self) -> Option<i64> {
        if !self.revision_check {
            return None;
        }
        self.items
            .first()
            .and_then(|item| item.revision)
            .filter(|revision| *revision >= 0)
    }
}

impl Job for ItemModifyJob {
    type Output = Vec<Item>;

    fn kind(&self) -> CommandKind {
        CommandKind::ModifyItems
    }

    fn local_result(&mut self) -> Option<Vec<Item>> {
        self.changes
            .is_empty()
            .then(|| std::mem::take(&mut self.items))
    }

    fn build_command(&self) -> Result<Command, JobError> {
        Ok(Command::ModifyItems {
            items: Scope::from_entities(&self.items)?,
            revision: self.base_revision(),
            changes: self.changes.clone(),
        })
    }

    fn handle_response(&mut self, response: Response) -> Result<JobStep<Vec<Item>>, JobError> {
        match response {
            Response::ModifyItems { revisions } => {
                for update in revisions {
                    let Some(item) = self.items.iter_mut().find(|item| item.id == update.id) else {
                        continue;
                    };
                    // Never step back to an older revision.
                    if item.revision.is_none_or(|current| update.revision >= current) {
                        item.revision = Some(update.revision);
                    }
                }
                Ok(JobStep::Done(std::mem::take(&mut self.items)))
            }
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use akonadi_proto::{ErrorCode, ItemId, ItemRevision, ProtocolError, Tag};

    use super::*;
    use crate::job::{JobRunner, PendingJob};

    fn stored(id: i64, revision: i64) -> Item {
        Item {
            revision: Some(revision),
            ..Item::new(id)
        }
    }

    #[test]
    fn single_item_is_checked_against_its_revision() {
        let job = ItemModifyJob::new(stored(5, 3)).add_flag("\\Seen");
        assert_eq!(
            job.build_command().expect("command"),
            Command::ModifyItems {
                items: Scope::uid(5),
                revision: Some(3),
                changes: ItemChanges {
                    added_flags: ["\\Seen".to_string()].into(),
                    ..ItemChanges::default()
                },
            }
        );
    }

    #[test]
    fn revision_check_can_be_disabled() {
        let job = ItemModifyJob::new(stored(5, 3))
            .add_flag("\\Seen")
            .disable_revision_check();
        assert!(matches!(
            job.build_command(),
            Ok(Command::ModifyItems { revision: None, .. })
        ));

        let unknown = ItemModifyJob::new(Item::new(5)).add_flag("\\Seen");
        assert!(matches!(
            unknown.build_command(),
            Ok(Command::ModifyItems { revision: None, .. })
        ));
    }

    #[test]
    fn batches_skip_the_revision_check() {
        let job = ItemModifyJob::for_items(vec![stored(1, 2), stored(2, 9)]).remove_flag("\\Flagged");
        match job.build_command().expect("command") {
            Command::ModifyItems {
                items,
                revision,
                changes,
            } => {
                assert_eq!(items, Scope::Uid(vec![1, 2]));
                assert_eq!(revision, None);
                assert!(changes.removed_flags.contains("\\Flagged"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flag_overwrite_absorbs_later_edits() {
        let job = ItemModifyJob::for_items(vec![Item::new(1)])
            .add_flag("\\Seen")
            .set_flags(["\\Answered"])
            .add_flag("\\Seen")
            .remove_flag("\\Answered");
        let Ok(Command::ModifyItems { changes, .. }) = job.build_command() else {
            panic!("command should build");
        };
        assert_eq!(changes.flags, Some(BTreeSet::from(["\\Seen".to_string()])));
        assert!(changes.added_flags.is_empty());
        assert!(changes.removed_flags.is_empty());
    }

    #[test]
    fn nothing_to_change_completes_locally() {
        let mut job = ItemModifyJob::for_items(vec![Item::new(1)]);
        assert_eq!(job.local_result(), Some(vec![Item::new(1)]));

        let mut job = ItemModifyJob::new(Item::with_remote_id("rid"));
        assert_eq!(job.local_result(), None);
    }

    #[test]
    fn new_revisions_only_move_forward() {
        let mut job = ItemModifyJob::for_items(vec![stored(1, 4), stored(2, 4)]).add_flag("x");
        let step = job
            .handle_response(Response::ModifyItems {
                revisions: vec![
                    ItemRevision {
                        id: ItemId(1),
                        revision: 5,
                    },
                    ItemRevision {
                        id: ItemId(2),
                        revision: 3,
                    },
                    ItemRevision {
                        id: ItemId(9),
                        revision: 1,
                    },
                ],
            })
            .expect("response");
        assert_eq!(step, JobStep::Done(vec![stored(1, 5), stored(2, 4)]));
    }

    #[tokio::test]
    async fn conflict_is_reported_as_server_error() {
        let job = ItemModifyJob::new(stored(5, 3)).add_flag("\\Seen");
        let (mut runner, handle) = JobRunner::new(job, Tag(2));
        let done = runner.on_response(Response::Error {
            kind: CommandKind::ModifyItems,
            error: ProtocolError::new(ErrorCode::Conflict, "item was modified in the meantime"),
        });

        assert!(done);
        assert!(matches!(
            handle.await,
            Err(JobError::Server {
                code: ErrorCode::Conflict,
                ..
            })
        ));
    }
}
