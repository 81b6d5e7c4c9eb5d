//! Single-task execution of reconciliation loops.
//!
//! Each loop runs as one tokio task that owns all of the loop's mutable state.
//! Periodic ticks, on-demand triggers, desired-state notifications and the
//! completions of outstanding requests are all multiplexed onto that task, so
//! cycles never interleave and request continuations always run on the owner.
//! A cycle in progress is abandoned at its next await point once shutdown is
//! requested.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::{ControlError, types::TopicNotification};

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Outbound requests issued (invitations or partition creations).
    pub requests_issued: usize,
    /// Shortfalls skipped because a request for them is still in flight.
    pub suppressed: usize,
    /// Completion records appended.
    pub completions_appended: usize,
    /// Queries, selections or id allocations that failed during the cycle.
    pub failures: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.requests_issued == 0 && self.completions_appended == 0
    }
}

/// A reconciliation loop driven by [`spawn`].
#[async_trait]
pub trait Reconciler: Send + 'static {
    /// Result of one outstanding request, folded back via [`Reconciler::on_outcome`].
    type Outcome: Send + 'static;

    fn name(&self) -> &'static str;

    fn tick_interval(&self) -> Duration;

    /// Run one cycle, optionally restricted to a single topic.
    async fn run_cycle(&mut self, topic: Option<&str>) -> CycleReport;

    /// Requests issued by earlier cycles that have not completed yet.
    fn outstanding(&mut self) -> &mut JoinSet<Self::Outcome>;

    fn on_outcome(&mut self, outcome: Self::Outcome);

    /// Whether a desired-state notification should trigger a cycle for its topic.
    fn wants(&self, notification: &TopicNotification) -> bool {
        matches!(notification, TopicNotification::Created { .. })
    }

    /// Wait for every outstanding request and fold in its outcome.
    async fn settle(&mut self) {
        while let Some(joined) = self.outstanding().join_next().await {
            self.complete(joined);
        }
    }

    #[doc(hidden)]
    fn complete(&mut self, joined: Result<Self::Outcome, JoinError>) {
        match joined {
            Ok(outcome) => self.on_outcome(outcome),
            Err(e) if e.is_cancelled() => debug!("{}: request task cancelled", self.name()),
            Err(e) => error!("{}: request task failed: {e}", self.name()),
        }
    }
}

#[derive(Debug)]
enum Command {
    Trigger { topic: String },
    Shutdown,
}

/// Handle to a running reconciliation loop.
#[derive(Debug)]
pub struct ReconcilerHandle {
    name: &'static str,
    mailbox: mpsc::Sender<Command>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request a cycle restricted to `topic`.
    pub async fn trigger(&self, topic: impl Into<String>) -> Result<(), ControlError> {
        self.mailbox
            .send(Command::Trigger {
                topic: topic.into(),
            })
            .await
            .map_err(|e| ControlError::from_transport_error(e, "reconciler mailbox"))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for its task to exit.
    ///
    /// A cycle still running is interrupted rather than awaited.
    pub async fn shutdown(self) {
        // The loop may already be gone; awaiting the task below covers both cases
        let _ = self.stop.send(true);
        let _ = self.mailbox.try_send(Command::Shutdown);
        if let Err(e) = self.task.await {
            error!("{}: reconciler task ended abnormally: {e}", self.name);
        }
    }
}

/// Spawn `reconciler` onto its own task.
///
/// `notifications` is typically obtained from
/// [`DesiredStateStore::subscribe`](crate::traits::DesiredStateStore::subscribe).
pub fn spawn<R: Reconciler>(
    reconciler: R,
    notifications: Option<broadcast::Receiver<TopicNotification>>,
    mailbox_capacity: usize,
) -> ReconcilerHandle {
    let (mailbox, commands) = mpsc::channel(mailbox_capacity.max(1));
    let (stop, stopping) = watch::channel(false);
    let name = reconciler.name();
    let task = tokio::spawn(run(reconciler, commands, notifications, stopping));

    ReconcilerHandle {
        name,
        mailbox,
        stop,
        task,
    }
}

async fn run<R: Reconciler>(
    mut reconciler: R,
    mut commands: mpsc::Receiver<Command>,
    mut notifications: Option<broadcast::Receiver<TopicNotification>>,
    mut stopping: watch::Receiver<bool>,
) {
    let name = reconciler.name();
    let mut ticker = tokio::time::interval(reconciler.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "{name}: started with tick interval {:?}",
        reconciler.tick_interval()
    );

    loop {
        let completed = tokio::select! {
            _ = stopping.wait_for(|stop| *stop) => break,
            _ = ticker.tick() => {
                interruptible(&mut reconciler, None, &mut stopping).await
            }
            command = commands.recv() => match command {
                Some(Command::Trigger { topic }) => {
                    debug!("{name}: on-demand cycle for topic '{topic}'");
                    interruptible(&mut reconciler, Some(&topic), &mut stopping).await
                }
                Some(Command::Shutdown) | None => break,
            },
            received = next_notification(&mut notifications) => match received {
                Ok(notification) if reconciler.wants(&notification) => {
                    interruptible(&mut reconciler, Some(notification.topic()), &mut stopping).await
                }
                Ok(_) => true,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("{name}: missed {skipped} topic notifications, running a full cycle");
                    interruptible(&mut reconciler, None, &mut stopping).await
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("{name}: desired-state notifications closed");
                    notifications = None;
                    true
                }
            },
            joined = reconciler.outstanding().join_next(), if !reconciler.outstanding().is_empty() => {
                if let Some(joined) = joined {
                    reconciler.complete(joined);
                }
                true
            }
        };

        if !completed {
            info!("{name}: shutdown requested during a cycle, abandoning it");
            break;
        }
    }

    let abandoned = reconciler.outstanding().len();
    reconciler.outstanding().abort_all();
    info!("{name}: stopped, abandoned {abandoned} outstanding requests");
}

/// Run one cycle unless shutdown is requested first.
///
/// Returns `false` when the cycle was abandoned.
async fn interruptible<R: Reconciler>(
    reconciler: &mut R,
    topic: Option<&str>,
    stopping: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = reconciler.run_cycle(topic) => true,
        _ = stopping.wait_for(|stop| *stop) => false,
    }
}

async fn next_notification(
    notifications: &mut Option<broadcast::Receiver<TopicNotification>>,
) -> Result<TopicNotification, broadcast::error::RecvError> {
    match notifications {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
