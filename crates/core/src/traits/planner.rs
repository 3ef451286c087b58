//! Plan generation trait

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Turns command text into a raw, untrusted plan
///
/// The returned value may be malformed in any way; it must pass through the
/// plan validator before dispatch.
#[async_trait]
pub trait ActionPlanner: Send + Sync + 'static {
    /// Generate a raw plan for `command`
    async fn plan(&self, command: &str) -> Result<Value>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
