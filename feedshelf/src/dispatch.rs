use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use interfaces::{Archiver, CreatedEntity, FeedItemConverter, FeedItemId, LinkId, Summarizer};
use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_concurrent_tasks: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentTask {
    Summarize(LinkId),
    Archive(LinkId),
    ConvertToLink(FeedItemId),
}

impl EnrichmentTask {
    pub fn name(&self) -> &'static str {
        match self {
            EnrichmentTask::Summarize(_) => "summarize",
            EnrichmentTask::Archive(_) => "archive",
            EnrichmentTask::ConvertToLink(_) => "convert",
        }
    }

    /// Tasks owed for a freshly created entity.
    pub fn for_entity(entity: CreatedEntity) -> Vec<EnrichmentTask> {
        match entity {
            CreatedEntity::Link(link) => vec![
                EnrichmentTask::Summarize(link),
                EnrichmentTask::Archive(link),
            ],
            CreatedEntity::FeedItem(item) => vec![EnrichmentTask::ConvertToLink(item)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    /// The queue shut down before the task ran.
    Dropped,
}

/// Handle to one dispatched task. Dropping it does not cancel the task.
#[derive(Debug)]
pub struct TaskTicket {
    pub id: u64,
    pub task: EnrichmentTask,
    outcome: oneshot::Receiver<TaskOutcome>,
}

impl TaskTicket {
    pub async fn outcome(self) -> TaskOutcome {
        self.outcome.await.unwrap_or(TaskOutcome::Dropped)
    }
}

/// One unit of the pending count, released when dropped.
struct PendingSlot(Arc<watch::Sender<usize>>);

impl PendingSlot {
    fn take(pending: &Arc<watch::Sender<usize>>) -> Self {
        pending.send_modify(|n| *n += 1);
        Self(pending.clone())
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n -= 1);
    }
}

struct Envelope {
    id: u64,
    task: EnrichmentTask,
    reply: oneshot::Sender<TaskOutcome>,
    // Held until the task has replied, or until the envelope is discarded unrun.
    slot: PendingSlot,
}

/// Cheap, cloneable front of the queue. Creators hand tasks to an unbounded
/// queue and return immediately; each task runs once and its outcome is only
/// visible through the `TaskTicket` returned here.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
    next_id: Arc<AtomicU64>,
    pending: Arc<watch::Sender<usize>>,
}

impl EventDispatcher {
    /// Called right after a Link or FeedItem has been stored. Never blocks.
    pub fn on_entity_created(&self, entity: CreatedEntity) -> Vec<TaskTicket> {
        EnrichmentTask::for_entity(entity)
            .into_iter()
            .map(|task| self.dispatch(task))
            .collect()
    }

    pub fn dispatch(&self, task: EnrichmentTask) -> TaskTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, outcome) = oneshot::channel();

        // Counted before sending so the worker can never decrement first.
        let slot = PendingSlot::take(&self.pending);
        let envelope = Envelope {
            id,
            task,
            reply,
            slot,
        };
        if self.sender.send(envelope).is_err() {
            warn!("Dispatch queue closed, dropping {} task {}", task.name(), id);
        } else {
            debug!("Queued {} task {} ({:?})", task.name(), id, task);
        }

        TaskTicket { id, task, outcome }
    }

    /// Tasks queued or running right now.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolves once no task is queued or running, including tasks spawned
    /// by other tasks (a converted feed item creating a link).
    pub async fn wait_idle(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = pending.wait_for(|n| *n == 0).await;
    }
}

/// The enrichment capabilities a queue runs tasks against.
#[derive(Clone)]
pub struct Collaborators {
    pub summarizer: Arc<dyn Summarizer>,
    pub archiver: Arc<dyn Archiver>,
    pub converter: Arc<dyn FeedItemConverter>,
}

impl Collaborators {
    async fn run(&self, task: EnrichmentTask) -> TaskOutcome {
        // Each attempt runs in its own task so a panic is contained.
        let attempt = match task {
            EnrichmentTask::Summarize(link) => {
                let summarizer = self.summarizer.clone();
                tokio::spawn(async move { summarizer.maybe_summarize(link).await })
            }
            EnrichmentTask::Archive(link) => {
                let archiver = self.archiver.clone();
                tokio::spawn(async move { archiver.maybe_archive(link).await })
            }
            EnrichmentTask::ConvertToLink(item) => {
                let converter = self.converter.clone();
                tokio::spawn(async move { converter.maybe_convert(item).await })
            }
        };

        match attempt.await {
            Ok(Ok(())) => TaskOutcome::Completed,
            Ok(Err(e)) => TaskOutcome::Failed(format!("{:#}", e)),
            Err(e) => TaskOutcome::Failed(format!("attempt panicked: {}", e)),
        }
    }
}

/// Receiving end of the queue; consumed by `spawn`. Dropping it discards
/// every queued task as `Dropped`.
pub struct DispatchQueue {
    receiver: mpsc::UnboundedReceiver<Envelope>,
    config: DispatchConfig,
}

pub fn channel(config: DispatchConfig) -> (EventDispatcher, DispatchQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let (pending, _) = watch::channel(0);
    let pending = Arc::new(pending);
    let dispatcher = EventDispatcher {
        sender,
        next_id: Arc::new(AtomicU64::new(1)),
        pending,
    };
    let queue = DispatchQueue { receiver, config };
    (dispatcher, queue)
}

impl DispatchQueue {
    pub fn spawn(self, collaborators: Collaborators) -> JoinHandle<()> {
        tokio::spawn(self.run(collaborators))
    }

    async fn run(mut self, collaborators: Collaborators) {
        let workers = self.config.max_concurrent_tasks.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        info!("Dispatch queue started with {} workers", workers);

        while let Some(envelope) = self.receiver.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let collaborators = collaborators.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let Envelope {
                    id,
                    task,
                    reply,
                    slot,
                } = envelope;

                let outcome = collaborators.run(task).await;
                match &outcome {
                    TaskOutcome::Failed(reason) => {
                        warn!("Enrichment {} task {} failed: {}", task.name(), id, reason)
                    }
                    _ => debug!("Enrichment {} task {} completed", task.name(), id),
                }

                // Nobody may be listening; that is fine.
                let _ = reply.send(outcome);
                drop(slot);
            });
        }

        info!("Dispatch queue stopped");
    }
}
