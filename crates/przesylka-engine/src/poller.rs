//! Scheduled polling around a reconciliation loop.
//!
//! Runs one [`Reconciler`] on a fixed interval inside a tokio task. The
//! first cycle runs immediately on spawn; afterwards the loop wakes on the
//! timer or on an explicit refresh command. A failed cycle is logged and
//! the loop keeps running.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::reconcile::{CycleOutcome, Reconciler};

/// Couriers rate-limit aggressively; refresh sparingly.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

enum PollerCommand {
    RefreshNow,
    Shutdown,
}

/// Handle to a running poller task.
pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
    task: JoinHandle<Reconciler>,
}

impl PollerHandle {
    /// Request an out-of-band cycle. Returns `false` if the loop already
    /// stopped.
    pub async fn refresh_now(&self) -> bool {
        self.commands.send(PollerCommand::RefreshNow).await.is_ok()
    }

    /// Stop the loop and hand its reconciler back, with the active set
    /// intact for a later restart.
    pub async fn shutdown(self) -> Option<Reconciler> {
        let _ = self.commands.send(PollerCommand::Shutdown).await;
        match self.task.await {
            Ok(reconciler) => Some(reconciler),
            Err(join_error) => {
                error!(error = %join_error, "poller task aborted");
                None
            }
        }
    }
}

/// Spawn a polling task over `reconciler`. Every successful cycle's outcome
/// is handed to `on_outcome` for dispatch to the platform.
pub fn spawn_poller<F>(mut reconciler: Reconciler, interval: Duration, mut on_outcome: F) -> PollerHandle
where
    F: FnMut(CycleOutcome) + Send + 'static,
{
    let (commands, mut receiver) = mpsc::channel(8);
    let task = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => run_once(&mut reconciler, &mut on_outcome).await,
                command = receiver.recv() => match command {
                    Some(PollerCommand::RefreshNow) => run_once(&mut reconciler, &mut on_outcome).await,
                    Some(PollerCommand::Shutdown) | None => break,
                },
            }
        }
        reconciler
    });
    PollerHandle { commands, task }
}

async fn run_once<F>(reconciler: &mut Reconciler, on_outcome: &mut F)
where
    F: FnMut(CycleOutcome),
{
    let account_id = reconciler.account_id();
    let courier = reconciler.courier();
    match reconciler.run_cycle().await {
        Ok(outcome) => {
            info!(
                account = %account_id,
                courier = %courier,
                records = outcome.records.len(),
                events = outcome.events.len(),
                "cycle complete"
            );
            on_outcome(outcome);
        }
        Err(error) => {
            error!(account = %account_id, courier = %courier, error = %error, "cycle failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use przesylka_core::{Classifier, InpostAdapter, NoopHttpClient, Session};

    use crate::config::AccountId;

    fn idle_reconciler() -> Reconciler {
        let client = Arc::new(InpostAdapter::new(
            Arc::new(NoopHttpClient),
            Session::with_access_token("token"),
        ));
        Reconciler::new(AccountId::new(), client, Arc::new(Classifier::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately() {
        let (sender, mut outcomes) = mpsc::unbounded_channel();
        let handle = spawn_poller(idle_reconciler(), DEFAULT_POLL_INTERVAL, move |outcome| {
            let _ = sender.send(outcome.records.len());
        });

        assert_eq!(outcomes.recv().await, Some(0));
        assert!(handle.shutdown().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_triggers_an_extra_cycle() {
        let (sender, mut outcomes) = mpsc::unbounded_channel();
        let handle = spawn_poller(idle_reconciler(), DEFAULT_POLL_INTERVAL, move |outcome| {
            let _ = sender.send(outcome.records.len());
        });
        outcomes.recv().await;

        assert!(handle.refresh_now().await);
        assert_eq!(outcomes.recv().await, Some(0));

        let reconciler = handle.shutdown().await.expect("loop hands itself back");
        assert!(reconciler.active_ids().is_empty());
        assert!(outcomes.recv().await.is_none());
    }
}
