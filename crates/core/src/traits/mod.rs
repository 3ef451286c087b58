//! Collaborator traits for the voice command pipeline
//!
//! The pipeline's external engines sit behind these traits so backends can be
//! swapped by configuration and mocked in tests.
//!
//! ```text
//! Speech:
//!   - SpeechToText: Utterance → lowercase transcript (possibly empty)
//!
//! Planning:
//!   - ActionPlanner: command text → raw plan JSON (untrusted)
//!
//! Dispatch:
//!   - PlanDispatcher: validated plan → actuator request/response
//! ```

mod dispatch;
mod planner;
mod speech;

pub use dispatch::{DispatchReceipt, PlanDispatcher};
pub use planner::ActionPlanner;
pub use speech::SpeechToText;
