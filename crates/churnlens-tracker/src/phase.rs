use std::time::Duration;

use churnlens_core::{RunStatus, StatusTone};
use serde::{Deserialize, Serialize};

/// Where the tracker stands for the current run id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run id is tracked.
    #[default]
    Idle,
    /// A run id is tracked but no status has been observed yet.
    Pending,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn from_status(status: RunStatus) -> Self {
        match status {
            RunStatus::Queued => Self::Queued,
            RunStatus::Running => Self::Running,
            RunStatus::Succeeded => Self::Succeeded,
            RunStatus::Failed => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Delay before the next fetch, or `None` when polling must stop.
    pub fn next_poll_delay(self, interval: Duration) -> Option<Duration> {
        match self {
            Self::Pending | Self::Queued | Self::Running => Some(interval),
            Self::Idle | Self::Succeeded | Self::Failed => None,
        }
    }

    pub fn tone(self) -> StatusTone {
        match self {
            Self::Idle | Self::Pending => StatusTone::Idle,
            Self::Queued => StatusTone::Queued,
            Self::Running => StatusTone::Running,
            Self::Succeeded => StatusTone::Succeeded,
            Self::Failed => StatusTone::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases_stop_polling() {
        let interval = Duration::from_secs(3);

        assert_eq!(RunPhase::Pending.next_poll_delay(interval), Some(interval));
        assert_eq!(RunPhase::Queued.next_poll_delay(interval), Some(interval));
        assert_eq!(RunPhase::Running.next_poll_delay(interval), Some(interval));
        assert_eq!(RunPhase::Idle.next_poll_delay(interval), None);
        assert_eq!(RunPhase::Succeeded.next_poll_delay(interval), None);
        assert_eq!(RunPhase::Failed.next_poll_delay(interval), None);
    }

    #[test]
    fn tone_follows_observed_status() {
        assert_eq!(RunPhase::Pending.tone(), StatusTone::Idle);
        assert_eq!(
            RunPhase::from_status(RunStatus::Failed).tone(),
            StatusTone::Failed
        );
        assert!(RunPhase::from_status(RunStatus::Succeeded).is_terminal());
        assert!(!RunPhase::from_status(RunStatus::Running).is_terminal());
    }
}
