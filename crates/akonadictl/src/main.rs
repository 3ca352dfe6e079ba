use std::{
    collections::BTreeSet,
    future::Future,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use akonadi_client::{
    ClientConfig, ClientContext, ConfigError, JobError, NotificationStream, Session,
    jobs::{
        CollectionCopyJob, CollectionFetchJob, CollectionMoveJob, CollectionStatisticsJob,
        ItemCopyJob, ItemModifyJob, ItemMoveJob, TagDeleteJob, TagFetchJob,
    },
};
use akonadi_proto::{
    ChangeNotification, Collection, CollectionId, EntityRef, EntityType, FetchDepth, Item,
    Operation, SessionId, SubscriptionChange, TagInfo,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "akonadictl", about = "Akonadi client CLI")]
struct Cli {
    /// Server socket; defaults to AKONADI_SOCKET or the per-user runtime socket.
    #[arg(long)]
    socket: Option<PathBuf>,
    /// Session name announced at login.
    #[arg(long, default_value = "akonadictl")]
    session: String,
    /// How long to wait for each command.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Item counters of a collection.
    Stats { collection: i64 },
    /// List collections.
    Collections {
        #[arg(long, default_value_t = 0)]
        parent: i64,
        #[arg(long, value_enum, default_value_t = Depth::FirstLevel)]
        depth: Depth,
        #[arg(long)]
        resource: Option<String>,
        #[arg(long = "mime-type")]
        mime_types: Vec<String>,
        #[arg(long)]
        stats: bool,
    },
    CopyCollection { collection: i64, destination: i64 },
    MoveCollection { collection: i64, destination: i64 },
    CopyItems {
        destination: i64,
        #[arg(required = true, num_args = 1..)]
        items: Vec<i64>,
    },
    MoveItems {
        destination: i64,
        #[arg(required = true, num_args = 1..)]
        items: Vec<i64>,
    },
    /// Add or remove flags on items.
    FlagItems {
        #[arg(long = "add")]
        add: Vec<String>,
        #[arg(long = "remove")]
        remove: Vec<String>,
        #[arg(required = true, num_args = 1..)]
        items: Vec<i64>,
    },
    /// List tags; all of them when no id is given.
    Tags { ids: Vec<i64> },
    DeleteTag {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },
    /// Print change notifications as JSON lines until interrupted.
    Watch {
        #[arg(long = "collection")]
        collections: Vec<i64>,
        #[arg(long = "resource")]
        resources: Vec<String>,
        #[arg(long = "ignore-session")]
        ignored_sessions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Depth {
    Base,
    FirstLevel,
    Recursive,
}

impl From<Depth> for FetchDepth {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Base => FetchDepth::Base,
            Depth::FirstLevel => FetchDepth::FirstLevel,
            Depth::Recursive => FetchDepth::Recursive,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode notification: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no answer from the server within {ms} ms")]
    Timeout { ms: u64 },
    #[error("notification bus closed")]
    BusClosed,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(socket) = cli.socket {
        config = config.with_socket_path(socket);
    }
    debug!(socket = %config.socket_path.display(), session = %cli.session, "starting");

    let context = ClientContext::new(config);
    let deadline = Deadline {
        ms: cli.timeout_ms,
    };

    if let Command::Watch {
        collections,
        resources,
        ignored_sessions,
    } = cli.command
    {
        let change = watch_subscription(collections, resources, ignored_sessions);
        return watch(&context, cli.session, change, deadline).await;
    }

    let session = context.session(cli.session);
    match cli.command {
        Command::Stats { collection } => {
            let stats = deadline
                .run(session.exec(CollectionStatisticsJob::new(Collection::new(collection))))
                .await?;
            println!("count\t{}", stats.count);
            println!("unseen\t{}", stats.unseen);
            println!("size\t{}", stats.size);
        }
        Command::Collections {
            parent,
            depth,
            resource,
            mime_types,
            stats,
        } => {
            let mut job = CollectionFetchJob::new(Collection::new(parent), depth.into())
                .mime_types(mime_types)
                .include_statistics(stats);
            if let Some(resource) = resource {
                job = job.resource(resource);
            }
            for collection in deadline.run(session.exec(job)).await? {
                print_collection(&collection);
            }
        }
        Command::CopyCollection {
            collection,
            destination,
        } => {
            let job =
                CollectionCopyJob::new(Collection::new(collection), Collection::new(destination));
            deadline.run(session.exec(job)).await?;
        }
        Command::MoveCollection {
            collection,
            destination,
        } => {
            let job =
                CollectionMoveJob::new(Collection::new(collection), Collection::new(destination));
            deadline.run(session.exec(job)).await?;
        }
        Command::CopyItems { destination, items } => {
            let job = ItemCopyJob::new(to_items(items), Collection::new(destination));
            deadline.run(session.exec(job)).await?;
        }
        Command::MoveItems { destination, items } => {
            let job = ItemMoveJob::new(to_items(items), Collection::new(destination));
            deadline.run(session.exec(job)).await?;
        }
        Command::FlagItems { add, remove, items } => {
            let job = add.into_iter().fold(
                ItemModifyJob::for_items(to_items(items)),
                |job, flag| job.add_flag(flag),
            );
            let job = remove
                .into_iter()
                .fold(job, |job, flag| job.remove_flag(flag));
            for item in deadline.run(session.exec(job)).await? {
                println!("{}	{}", item.id, item.revision.unwrap_or(-1));
            }
        }
        Command::Tags { ids } => {
            let job = if ids.is_empty() {
                TagFetchJob::new()
            } else {
                TagFetchJob::for_tags(to_tags(ids))
            };
            for tag in deadline.run(session.exec(job)).await? {
                println!(
                    "{}\t{}\t{}",
                    tag.id,
                    tag.gid.as_deref().unwrap_or("-"),
                    tag.tag_type.as_deref().unwrap_or("-")
                );
            }
        }
        Command::DeleteTag { ids } => {
            deadline
                .run(session.exec(TagDeleteJob::new(to_tags(ids))))
                .await?;
        }
        // Runs on a notification bus above.
        Command::Watch { .. } => {}
    }

    logout(&session);
    Ok(())
}

/// Per-command time limit.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    ms: u64,
}

impl Deadline {
    async fn run<T>(
        self,
        job: impl Future<Output = Result<T, JobError>>,
    ) -> Result<T, CliError> {
        match timeout(Duration::from_millis(self.ms), job).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CliError::Timeout { ms: self.ms }),
        }
    }
}

fn logout(session: &Session) {
    debug!(session = %session.id(), "disconnecting");
    session.disconnect();
}

fn to_items(ids: Vec<i64>) -> Vec<Item> {
    ids.into_iter().map(Item::new).collect()
}

fn to_tags(ids: Vec<i64>) -> Vec<TagInfo> {
    ids.into_iter().map(TagInfo::new).collect()
}

fn print_collection(collection: &Collection) {
    let resource = collection.resource.as_deref().unwrap_or("-");
    match collection.statistics {
        Some(stats) => println!(
            "{}\t{}\t{}\t{}\t{}/{}",
            collection.id, collection.parent, collection.name, resource, stats.unseen, stats.count
        ),
        None => println!(
            "{}\t{}\t{}\t{}",
            collection.id, collection.parent, collection.name, resource
        ),
    }
}

fn watch_subscription(
    collections: Vec<i64>,
    resources: Vec<String>,
    ignored_sessions: Vec<String>,
) -> SubscriptionChange {
    let change = collections
        .into_iter()
        .fold(SubscriptionChange::default(), |change, id| {
            change.monitor_collection(CollectionId(id))
        });
    let change = resources
        .into_iter()
        .fold(change, |change, resource| change.monitor_resource(resource));
    ignored_sessions
        .into_iter()
        .fold(change, |change, session| {
            change.ignore_session(SessionId::from(session))
        })
}

async fn watch(
    context: &ClientContext,
    session: String,
    change: SubscriptionChange,
    deadline: Deadline,
) -> Result<(), CliError> {
    let bus = context.notification_bus(session);
    let mut notifications = bus.subscribe();
    deadline.run(bus.modify_subscription(change)).await?;

    let result = tokio::select! {
        result = print_notifications(&mut notifications) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    logout(bus.session());
    result
}

async fn print_notifications(notifications: &mut NotificationStream) -> Result<(), CliError> {
    while let Some(notification) = notifications.next().await {
        let line = serde_json::to_string(&NotificationView::from(&notification))?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Err(CliError::BusClosed)
}

/// JSON shape of a notification, with the session name as text.
#[derive(Debug, Serialize)]
struct NotificationView<'a> {
    session: String,
    entity_type: EntityType,
    operation: Operation,
    entities: &'a [EntityRef],
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_collection: Option<CollectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_dest_collection: Option<CollectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_resource: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    changed_parts: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    added_flags: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    removed_flags: &'a BTreeSet<String>,
}

impl<'a> From<&'a ChangeNotification> for NotificationView<'a> {
    fn from(notification: &'a ChangeNotification) -> Self {
        Self {
            session: notification.session.to_string(),
            entity_type: notification.entity_type,
            operation: notification.operation,
            entities: &notification.entities,
            parent_collection: notification.parent_collection,
            parent_dest_collection: notification.parent_dest_collection,
            resource: notification.resource.as_deref(),
            destination_resource: notification.destination_resource.as_deref(),
            changed_parts: &notification.changed_parts,
            added_flags: &notification.added_flags,
            removed_flags: &notification.removed_flags,
        }
    }
}
