//! Pipeline stages and their transition table

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress of a page build
///
/// `Verifying` and `Planning` are declared progress steps with no transitions
/// into or out of them; the orchestrator never enters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    /// Requesting the section plan
    Thinking,
    Verifying,
    Planning,
    /// Rendering sections one after another
    Generating,
    Completed,
    Error,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Thinking => write!(f, "thinking"),
            Self::Verifying => write!(f, "verifying"),
            Self::Planning => write!(f, "planning"),
            Self::Generating => write!(f, "generating"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Steps shown by a progress indicator, in order
pub const PROGRESS_STEPS: [PipelineStage; 4] = [
    PipelineStage::Thinking,
    PipelineStage::Verifying,
    PipelineStage::Planning,
    PipelineStage::Generating,
];

/// State of one progress step relative to the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

impl PipelineStage {
    /// Transition table
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        let allowed = matches!(
            (self, next),
            (Idle | Completed | Error, Thinking)
                | (Thinking, Generating)
                | (Thinking, Error)
                | (Generating, Completed)
                | (Generating, Error)
        );
        debug!(from = %self, to = %next, allowed, "PipelineStage::can_transition_to");
        allowed
    }

    /// A run is in flight; a new build must not start
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            PipelineStage::Thinking | PipelineStage::Verifying | PipelineStage::Planning | PipelineStage::Generating
        )
    }

    /// Whether any transition can ever lead into this stage
    pub fn is_reachable(self) -> bool {
        !matches!(self, PipelineStage::Verifying | PipelineStage::Planning)
    }

    /// Human label for progress displays
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Thinking => "Strategy",
            Self::Verifying => "Self-check",
            Self::Planning => "Final plan",
            Self::Generating => "Visuals",
            Self::Completed => "Done",
            Self::Error => "Failed",
        }
    }

    /// Status of a progress step while the pipeline is at `self`
    pub fn step_status(self, step: PipelineStage) -> StepStatus {
        if self == PipelineStage::Completed {
            return StepStatus::Completed;
        }
        let current = PROGRESS_STEPS.iter().position(|s| *s == self);
        let target = PROGRESS_STEPS.iter().position(|s| *s == step);
        match (current, target) {
            (Some(c), Some(t)) if c > t => StepStatus::Completed,
            (Some(c), Some(t)) if c == t => StepStatus::Active,
            _ => StepStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineStage::*;

    const ALL: [PipelineStage; 7] = [Idle, Thinking, Verifying, Planning, Generating, Completed, Error];

    #[test]
    fn test_allowed_transitions() {
        assert!(Idle.can_transition_to(Thinking));
        assert!(Completed.can_transition_to(Thinking));
        assert!(Error.can_transition_to(Thinking));
        assert!(Thinking.can_transition_to(Generating));
        assert!(Thinking.can_transition_to(Error));
        assert!(Generating.can_transition_to(Completed));
        assert!(Generating.can_transition_to(Error));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Idle.can_transition_to(Generating));
        assert!(!Thinking.can_transition_to(Thinking));
        assert!(!Thinking.can_transition_to(Completed));
        assert!(!Generating.can_transition_to(Thinking));
        assert!(!Completed.can_transition_to(Idle));
        assert!(!Error.can_transition_to(Idle));
    }

    #[test]
    fn test_declared_stages_have_no_transitions() {
        for stage in ALL {
            assert!(!stage.can_transition_to(Verifying));
            assert!(!stage.can_transition_to(Planning));
            assert!(!Verifying.can_transition_to(stage));
            assert!(!Planning.can_transition_to(stage));
        }
        assert!(!Verifying.is_reachable());
        assert!(!Planning.is_reachable());
        assert!(Generating.is_reachable());
    }

    #[test]
    fn test_in_flight() {
        assert!(Thinking.is_in_flight());
        assert!(Generating.is_in_flight());
        assert!(!Idle.is_in_flight());
        assert!(!Completed.is_in_flight());
        assert!(!Error.is_in_flight());
    }

    #[test]
    fn test_step_status() {
        assert_eq!(Generating.step_status(Thinking), StepStatus::Completed);
        assert_eq!(Generating.step_status(Generating), StepStatus::Active);
        assert_eq!(Thinking.step_status(Generating), StepStatus::Pending);
        assert_eq!(Idle.step_status(Thinking), StepStatus::Pending);
        assert_eq!(Completed.step_status(Generating), StepStatus::Completed);
        assert_eq!(Error.step_status(Thinking), StepStatus::Pending);
        assert_eq!(Thinking.step_status(Verifying), StepStatus::Pending);
        assert_eq!(Thinking.step_status(Planning), StepStatus::Pending);
        assert_eq!(Generating.step_status(Verifying), StepStatus::Completed);
        assert_eq!(Generating.step_status(Planning), StepStatus::Completed);
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Generating).unwrap(), "\"generating\"");
        let stage: PipelineStage = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(stage, Completed);
    }
}
