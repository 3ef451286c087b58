//! Controller events

use std::time::Duration;

use bruno_core::Plan;
use bruno_plan::PlanVerdict;

use crate::state::Phase;

/// How the dispatched plan was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// Planner output passed validation unchanged
    Valid,
    /// Planner output was repaired field by field
    Repaired,
    /// Planner output had no usable effect
    ValidatorFallback,
    /// Planner failed or timed out; validation skipped
    PlannerFailed,
}

impl PlanSource {
    pub fn from_verdict(verdict: &PlanVerdict) -> Self {
        match verdict {
            PlanVerdict::Valid(_) => PlanSource::Valid,
            PlanVerdict::Repaired { .. } => PlanSource::Repaired,
            PlanVerdict::Fallback { .. } => PlanSource::ValidatorFallback,
        }
    }

    /// Whether the fixed fallback plan is being sent
    pub fn is_fallback(&self) -> bool {
        matches!(self, PlanSource::ValidatorFallback | PlanSource::PlannerFailed)
    }
}

/// Broadcast to subscribers as the controller runs
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StateChanged { from: Phase, to: Phase },
    /// Wake accepted
    WakeDetected { transcript: String },
    /// Wake phrase heard inside the debounce window
    WakeDebounced {
        transcript: String,
        since_last: Duration,
    },
    /// Command text handed to the planner
    Command {
        text: String,
        /// Spoken in the same utterance as the wake phrase
        inline: bool,
        /// Nothing was heard; the default command was used
        defaulted: bool,
    },
    PlanReady { plan: Plan, source: PlanSource },
    Dispatched { status: u16, body: String },
    DispatchFailed { reason: String },
}
