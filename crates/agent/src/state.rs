//! Controller states

use std::fmt;

use serde_json::Value;

use bruno_core::Plan;

use crate::events::PlanSource;

/// Where the controller is in one wake-to-dispatch cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    /// Capturing utterances until one contains an armed wake phrase
    ListenWake,
    /// Capturing the command that follows the wake phrase
    ListenCommand,
    /// Asking the planner for a raw plan
    Plan { command: String },
    /// Raw planner output awaiting validation
    Validate { command: String, raw: Value },
    /// Validated plan awaiting delivery
    Dispatch { plan: Plan, source: PlanSource },
}

impl ControllerState {
    pub fn phase(&self) -> Phase {
        match self {
            ControllerState::ListenWake => Phase::ListenWake,
            ControllerState::ListenCommand => Phase::ListenCommand,
            ControllerState::Plan { .. } => Phase::Plan,
            ControllerState::Validate { .. } => Phase::Validate,
            ControllerState::Dispatch { .. } => Phase::Dispatch,
        }
    }
}

/// Payload-free state tag for logs and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    ListenWake,
    ListenCommand,
    Plan,
    Validate,
    Dispatch,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::ListenWake => "listen_wake",
            Phase::ListenCommand => "listen_command",
            Phase::Plan => "plan",
            Phase::Validate => "validate",
            Phase::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
