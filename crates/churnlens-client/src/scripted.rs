use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use churnlens_core::{AnalysisRequest, AnalysisRun, AnalysisTicket, DatasetKind, Id, RunStatus};
use serde_json::Value;

use crate::{AnalysisService, ClientError};

pub const SCRIPTED_SERVICE_NAME: &str = "scripted";

/// One scripted answer to `fetch_run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Status(RunStatus),
    Failed(Option<String>),
    TransportError(String),
}

impl From<RunStatus> for ScriptStep {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Failed => Self::Failed(None),
            other => Self::Status(other),
        }
    }
}

/// In-memory service that replays per-run status scripts. The last step of a
/// script repeats once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedAnalysisService {
    state: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    runs: HashMap<Id, RunScript>,
    datasets: HashMap<(Id, DatasetKind), Value>,
    tickets: VecDeque<AnalysisTicket>,
    requests: Vec<AnalysisRequest>,
    run_fetches: HashMap<Id, usize>,
    dataset_fetches: HashMap<DatasetKind, usize>,
    next_ticket: u64,
}

#[derive(Debug, Default)]
struct RunScript {
    steps: VecDeque<ScriptStep>,
    latency: Duration,
}

impl ScriptedAnalysisService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_script<S>(
        self,
        run_id: impl Into<Id>,
        steps: impl IntoIterator<Item = S>,
    ) -> Self
    where
        S: Into<ScriptStep>,
    {
        self.script_run(run_id, steps);
        self
    }

    pub fn with_run_latency(self, run_id: impl Into<Id>, latency: Duration) -> Self {
        self.with_state(|state| {
            state.runs.entry(run_id.into()).or_default().latency = latency;
        });
        self
    }

    pub fn with_dataset(
        self,
        repository_id: impl Into<Id>,
        kind: DatasetKind,
        payload: Value,
    ) -> Self {
        self.with_state(|state| {
            state.datasets.insert((repository_id.into(), kind), payload);
        });
        self
    }

    pub fn with_ticket(self, ticket: AnalysisTicket) -> Self {
        self.with_state(|state| state.tickets.push_back(ticket));
        self
    }

    /// Replaces the remaining script of `run_id`.
    pub fn script_run<S>(&self, run_id: impl Into<Id>, steps: impl IntoIterator<Item = S>)
    where
        S: Into<ScriptStep>,
    {
        let steps = steps.into_iter().map(Into::into).collect::<VecDeque<_>>();
        self.with_state(|state| {
            state.runs.entry(run_id.into()).or_default().steps = steps;
        });
    }

    pub fn run_fetch_count(&self, run_id: &Id) -> usize {
        self.with_state(|state| state.run_fetches.get(run_id).copied().unwrap_or(0))
    }

    pub fn dataset_fetch_count(&self, kind: DatasetKind) -> usize {
        self.with_state(|state| state.dataset_fetches.get(&kind).copied().unwrap_or(0))
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.with_state(|state| state.requests.clone())
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut ScriptState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut state)
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysisService {
    async fn request_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisTicket, ClientError> {
        Ok(self.with_state(|state| {
            state.requests.push(request.clone());
            state.tickets.pop_front().unwrap_or_else(|| {
                state.next_ticket += 1;
                AnalysisTicket {
                    run_id: Id::new(format!("run-{}", state.next_ticket)),
                    repository_id: Id::new(format!("repo-{}", state.next_ticket)),
                }
            })
        }))
    }

    async fn fetch_run(&self, run_id: &Id) -> Result<AnalysisRun, ClientError> {
        let (step, latency) = self.with_state(|state| {
            *state.run_fetches.entry(run_id.clone()).or_insert(0) += 1;
            let script = state.runs.get_mut(run_id)?;
            let step = if script.steps.len() > 1 {
                script.steps.pop_front()
            } else {
                script.steps.front().cloned()
            };
            Some((step, script.latency))
        })
        .ok_or_else(|| ClientError::NotFound(format!("run {run_id}")))?;

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let (status, error_message) = match step {
            Some(ScriptStep::Status(status)) => (status, None),
            Some(ScriptStep::Failed(message)) => (RunStatus::Failed, message),
            Some(ScriptStep::TransportError(message)) => {
                return Err(ClientError::Service(message));
            }
            None => (RunStatus::Queued, None),
        };

        Ok(AnalysisRun {
            id: run_id.clone(),
            status,
            created_at: None,
            started_at: None,
            completed_at: None,
            error_message,
        })
    }

    async fn fetch_dataset(
        &self,
        repository_id: &Id,
        kind: DatasetKind,
    ) -> Result<Value, ClientError> {
        self.with_state(|state| {
            *state.dataset_fetches.entry(kind).or_insert(0) += 1;
            state
                .datasets
                .get(&(repository_id.clone(), kind))
                .cloned()
                .ok_or_else(|| {
                    ClientError::NotFound(format!(
                        "{} for repository {repository_id}",
                        kind.as_str()
                    ))
                })
        })
    }

    fn service_name(&self) -> &str {
        SCRIPTED_SERVICE_NAME
    }
}
