//! Workflow run state as reported by the external workflow engine.

use serde::{Deserialize, Serialize};

/// Phase of a workflow run.
///
/// `Unknown` carries any phase string the engine reports that we do not model;
/// no transition table has rows for it, so an unknown phase always means "no
/// change this cycle".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Stopped,
    Unknown,
}

impl WorkflowPhase {
    /// Parses the engine's phase string.
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Error" => Self::Error,
            "Stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Error => "Error",
            Self::Stopped => "Stopped",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time view of one workflow run.
///
/// Fetched fresh every cycle and never persisted as-is; only the translated
/// status and the rendered description survive the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    /// Free-form progress indicator, e.g. `"2/5"`.
    pub progress: String,
    /// Last human-readable message from the run.
    pub message: String,
    /// True when the run is suspended mid-flight.
    pub suspended: bool,
}

impl WorkflowSnapshot {
    /// Renders the status description persisted alongside the domain status.
    pub fn status_desc(&self) -> String {
        format!("({}) {}", self.progress, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_phases() {
        assert_eq!(WorkflowPhase::parse("Running"), WorkflowPhase::Running);
        assert_eq!(WorkflowPhase::parse("Succeeded"), WorkflowPhase::Succeeded);
        assert_eq!(WorkflowPhase::parse("Failed"), WorkflowPhase::Failed);
        assert_eq!(WorkflowPhase::parse("Error"), WorkflowPhase::Error);
        assert_eq!(WorkflowPhase::parse("Stopped"), WorkflowPhase::Stopped);
    }

    #[test]
    fn parse_unmodeled_phase() {
        assert_eq!(WorkflowPhase::parse("Omitted"), WorkflowPhase::Unknown);
        assert_eq!(WorkflowPhase::parse(""), WorkflowPhase::Unknown);
    }

    #[test]
    fn status_desc_format() {
        let snapshot = WorkflowSnapshot {
            phase: WorkflowPhase::Succeeded,
            progress: "2/2".into(),
            message: "done".into(),
            suspended: false,
        };
        assert_eq!(snapshot.status_desc(), "(2/2) done");
    }
}
