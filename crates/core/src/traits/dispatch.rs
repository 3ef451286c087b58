//! Actuator dispatch trait

use crate::{Plan, Result};
use async_trait::async_trait;

/// Acknowledgement returned by the actuator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Transport-level status (HTTP status for the HTTP dispatcher)
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// Delivers a validated plan to the actuator
///
/// Failure carries the reason in the error; callers log it and move on.
#[async_trait]
pub trait PlanDispatcher: Send + Sync + 'static {
    /// Send one plan
    async fn send(&self, plan: &Plan) -> Result<DispatchReceipt>;

    /// Target description for logging
    fn target(&self) -> &str;
}
