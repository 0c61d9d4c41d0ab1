use std::sync::{Arc, Mutex};
use std::time::Duration;

use churnlens_client::AnalysisService;
use churnlens_config::PollingConfig;
use churnlens_core::{AnalysisRun, Id, StatusTone};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

mod phase;

pub use phase::RunPhase;

/// What consumers see of the tracked run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: Option<Id>,
    pub phase: RunPhase,
    pub run: Option<AnalysisRun>,
    /// Transient fetch failure, or the terminal failure message of a failed
    /// run.
    pub error: Option<String>,
    pub tone: StatusTone,
}

impl RunSnapshot {
    fn idle() -> Self {
        Self::default()
    }

    fn pending(run_id: Id) -> Self {
        Self {
            run_id: Some(run_id),
            phase: RunPhase::Pending,
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Polls one analysis run at a time until it reaches a terminal status.
///
/// Tracking a different id, `untrack`, or dropping the tracker aborts the
/// previous poll task and bumps the generation; snapshots are published under
/// the same lock that guards the generation, so a superseded poll can never
/// overwrite current state.
pub struct RunLifecycleTracker {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
    shared: Arc<TrackerShared>,
}

struct TrackerShared {
    state: Mutex<TrackerState>,
    snapshots: watch::Sender<RunSnapshot>,
}

#[derive(Default)]
struct TrackerState {
    generation: u64,
    run_id: Option<Id>,
    task: Option<JoinHandle<()>>,
}

impl RunLifecycleTracker {
    pub fn new(service: Arc<dyn AnalysisService>, interval: Duration) -> Self {
        let (snapshots, _) = watch::channel(RunSnapshot::idle());
        Self {
            service,
            interval,
            shared: Arc::new(TrackerShared {
                state: Mutex::new(TrackerState::default()),
                snapshots,
            }),
        }
    }

    pub fn from_config(service: Arc<dyn AnalysisService>, config: &PollingConfig) -> Self {
        Self::new(service, Duration::from_millis(config.interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling `run_id`, superseding any previous id. `None` returns
    /// the tracker to idle. Supplying the id already tracked does nothing,
    /// even after it reached a terminal status.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&self, run_id: Option<Id>) {
        let mut state = self.shared.lock_state();
        if state.run_id == run_id {
            return;
        }
        self.restart(&mut state, run_id);
    }

    /// Stops polling and returns to idle.
    pub fn untrack(&self) {
        let mut state = self.shared.lock_state();
        self.restart(&mut state, None);
    }

    /// Polls the current id again from scratch, even if it is terminal.
    pub fn resubscribe(&self) {
        let mut state = self.shared.lock_state();
        let run_id = state.run_id.clone();
        self.restart(&mut state, run_id);
    }

    pub fn tracked_run_id(&self) -> Option<Id> {
        self.shared.lock_state().run_id.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Resolves once the tracked run is terminal, or immediately when nothing
    /// is tracked.
    pub async fn wait_for_terminal(&self) -> RunSnapshot {
        let mut receiver = self.subscribe();
        match receiver
            .wait_for(|snapshot| snapshot.run_id.is_none() || snapshot.is_terminal())
            .await
        {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    fn restart(&self, state: &mut TrackerState, run_id: Option<Id>) {
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        state.run_id = run_id.clone();

        let Some(run_id) = run_id else {
            tracing::debug!("run tracking stopped");
            self.shared.snapshots.send_replace(RunSnapshot::idle());
            return;
        };

        tracing::debug!(run_id = %run_id, generation = state.generation, "tracking analysis run");
        self.shared
            .snapshots
            .send_replace(RunSnapshot::pending(run_id.clone()));
        state.task = Some(tokio::spawn(poll_run(
            Arc::clone(&self.service),
            Arc::clone(&self.shared),
            state.generation,
            run_id,
            self.interval,
        )));
    }
}

impl Drop for RunLifecycleTracker {
    fn drop(&mut self) {
        let mut state = self.shared.lock_state();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}

impl TrackerShared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes `snapshot` unless `generation` has been superseded.
    fn publish(&self, generation: u64, snapshot: RunSnapshot) -> bool {
        let state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        self.snapshots.send_replace(snapshot);
        true
    }
}

async fn poll_run(
    service: Arc<dyn AnalysisService>,
    shared: Arc<TrackerShared>,
    generation: u64,
    run_id: Id,
    interval: Duration,
) {
    let mut last_run: Option<AnalysisRun> = None;

    loop {
        tracing::debug!(run_id = %run_id, "polling analysis run");
        let snapshot = match service.fetch_run(&run_id).await {
            Ok(run) => {
                let phase = RunPhase::from_status(run.status);
                let error = run.failure_message();
                if let Some(message) = &error {
                    tracing::warn!(run_id = %run_id, error = %message, "analysis run failed");
                } else if phase.is_terminal() {
                    tracing::info!(run_id = %run_id, "analysis run succeeded");
                }
                last_run = Some(run.clone());
                RunSnapshot {
                    run_id: Some(run_id.clone()),
                    phase,
                    run: Some(run),
                    error,
                    tone: phase.tone(),
                }
            }
            Err(err) => {
                tracing::warn!(run_id = %run_id, error = %err, "failed to fetch analysis run");
                let phase = last_run
                    .as_ref()
                    .map(|run| RunPhase::from_status(run.status))
                    .unwrap_or(RunPhase::Pending);
                RunSnapshot {
                    run_id: Some(run_id.clone()),
                    phase,
                    run: last_run.clone(),
                    error: Some(err.to_string()),
                    tone: phase.tone(),
                }
            }
        };

        let phase = snapshot.phase;
        if !shared.publish(generation, snapshot) {
            tracing::debug!(run_id = %run_id, "dropping superseded poll result");
            return;
        }

        let Some(delay) = phase.next_poll_delay(interval) else {
            return;
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use churnlens_client::{ScriptStep, ScriptedAnalysisService};
    use churnlens_core::{FAILED_RUN_FALLBACK_MESSAGE, RunStatus};

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(3_000);

    fn tracker_with(service: &Arc<ScriptedAnalysisService>) -> RunLifecycleTracker {
        RunLifecycleTracker::new(Arc::clone(service) as Arc<dyn AnalysisService>, INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn idle_until_a_run_is_tracked() {
        let service = Arc::new(ScriptedAnalysisService::new());
        let tracker = tracker_with(&service);

        assert_eq!(tracker.snapshot(), RunSnapshot::idle());
        tracker.track(None);
        assert_eq!(tracker.snapshot().tone, StatusTone::Idle);
        assert_eq!(tracker.wait_for_terminal().await.run_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_succeeded_then_stops() {
        let run = Id::new("run-c");
        let service = Arc::new(ScriptedAnalysisService::new().with_run_script(
            run.clone(),
            [
                RunStatus::Running,
                RunStatus::Running,
                RunStatus::Running,
                RunStatus::Succeeded,
            ],
        ));
        let tracker = tracker_with(&service);

        tracker.track(Some(run.clone()));
        let done = tracker.wait_for_terminal().await;

        assert_eq!(service.run_fetch_count(&run), 4);
        assert_eq!(done.run.as_ref().map(|run| run.status), Some(RunStatus::Succeeded));
        assert_eq!(done.error, None);
        assert_eq!(done.tone, StatusTone::Succeeded);

        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(service.run_fetch_count(&run), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retracking_the_same_id_is_a_no_op_until_resubscribed() {
        let run = Id::new("run-same");
        let service = Arc::new(
            ScriptedAnalysisService::new().with_run_script(run.clone(), [RunStatus::Succeeded]),
        );
        let tracker = tracker_with(&service);

        tracker.track(Some(run.clone()));
        tracker.wait_for_terminal().await;
        tracker.track(Some(run.clone()));
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(service.run_fetch_count(&run), 1);

        tracker.resubscribe();
        tracker.wait_for_terminal().await;
        assert_eq!(service.run_fetch_count(&run), 2);

        tracker.untrack();
        tracker.track(Some(run.clone()));
        tracker.wait_for_terminal().await;
        assert_eq!(service.run_fetch_count(&run), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_keep_polling_without_failing_the_run() {
        let run = Id::new("run-flaky");
        let service = Arc::new(ScriptedAnalysisService::new().with_run_script(
            run.clone(),
            [
                ScriptStep::Status(RunStatus::Running),
                ScriptStep::TransportError("connection reset".to_owned()),
                ScriptStep::Status(RunStatus::Succeeded),
            ],
        ));
        let tracker = tracker_with(&service);
        let mut receiver = tracker.subscribe();

        tracker.track(Some(run.clone()));
        let flaky = receiver
            .wait_for(|snapshot| snapshot.error.is_some())
            .await
            .expect("error snapshot")
            .clone();

        assert_eq!(flaky.phase, RunPhase::Running);
        assert_eq!(flaky.tone, StatusTone::Running);
        assert_eq!(
            flaky.run.as_ref().map(|run| run.status),
            Some(RunStatus::Running)
        );
        assert!(
            flaky
                .error
                .as_deref()
                .is_some_and(|error| error.contains("connection reset"))
        );

        let done = tracker.wait_for_terminal().await;
        assert_eq!(done.tone, StatusTone::Succeeded);
        assert_eq!(done.error, None);
        assert_eq!(service.run_fetch_count(&run), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_surfaces_message_or_fallback() {
        let with_message = Id::new("run-msg");
        let without_message = Id::new("run-bare");
        let service = Arc::new(
            ScriptedAnalysisService::new()
                .with_run_script(
                    with_message.clone(),
                    [
                        ScriptStep::Status(RunStatus::Queued),
                        ScriptStep::Failed(Some("repository not found".to_owned())),
                    ],
                )
                .with_run_script(without_message.clone(), [RunStatus::Failed]),
        );
        let tracker = tracker_with(&service);

        tracker.track(Some(with_message.clone()));
        let failed = tracker.wait_for_terminal().await;
        assert_eq!(failed.tone, StatusTone::Failed);
        assert_eq!(failed.error.as_deref(), Some("repository not found"));
        assert_eq!(service.run_fetch_count(&with_message), 2);

        tracker.track(Some(without_message.clone()));
        let bare = tracker.wait_for_terminal().await;
        assert_eq!(bare.run_id, Some(without_message));
        assert_eq!(bare.error.as_deref(), Some(FAILED_RUN_FALLBACK_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn switching_ids_cancels_the_previous_poll() {
        let slow = Id::new("run-slow");
        let fast = Id::new("run-fast");
        let service = Arc::new(
            ScriptedAnalysisService::new()
                .with_run_script(slow.clone(), [RunStatus::Running])
                .with_run_latency(slow.clone(), Duration::from_secs(5))
                .with_run_script(fast.clone(), [RunStatus::Succeeded]),
        );
        let tracker = tracker_with(&service);

        tracker.track(Some(slow.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.run_fetch_count(&slow), 1);

        tracker.track(Some(fast.clone()));
        let done = tracker.wait_for_terminal().await;
        assert_eq!(done.run_id, Some(fast.clone()));
        assert_eq!(done.tone, StatusTone::Succeeded);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let latest = tracker.snapshot();
        assert_eq!(latest.run_id, Some(fast));
        assert_eq!(latest.tone, StatusTone::Succeeded);
        assert_eq!(service.run_fetch_count(&slow), 1);
    }

    #[test]
    fn superseded_generation_cannot_publish() {
        let (snapshots, _) = watch::channel(RunSnapshot::idle());
        let shared = TrackerShared {
            state: Mutex::new(TrackerState {
                generation: 2,
                run_id: Some(Id::new("current")),
                task: None,
            }),
            snapshots,
        };

        assert!(!shared.publish(1, RunSnapshot::pending(Id::new("stale"))));
        assert_eq!(shared.snapshots.borrow().run_id, None);
        assert!(shared.publish(2, RunSnapshot::pending(Id::new("current"))));
        assert_eq!(shared.snapshots.borrow().run_id, Some(Id::new("current")));
    }
}
