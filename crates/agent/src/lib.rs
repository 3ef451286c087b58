//! Wake-to-dispatch controller
//!
//! Features:
//! - `PipelineController`: listen for wake, capture the command, plan,
//!   validate, dispatch, repeat
//! - Planner and recognizer failures resolved by default substitution
//! - `PipelineEvent` broadcast for observers and tests
//! - Cooperative shutdown through a `watch` channel

pub mod controller;
pub mod events;
pub mod state;

pub use controller::{ControllerConfig, PipelineController};
pub use events::{PipelineEvent, PlanSource};
pub use state::{ControllerState, Phase};

use thiserror::Error;

/// Agent errors
///
/// Only capture loss and startup problems surface here; everything the
/// collaborators return is resolved inside the loop.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl From<bruno_pipeline::PipelineError> for AgentError {
    fn from(err: bruno_pipeline::PipelineError) -> Self {
        AgentError::Capture(err.to_string())
    }
}

impl From<AgentError> for bruno_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Config(msg) => bruno_core::Error::Config(msg),
            other => bruno_core::Error::Pipeline(other.to_string()),
        }
    }
}
