//! Action plan validation and repair
//!
//! Every plan bound for the actuator passes through [`validate_or_repair`].
//! It is total: any JSON value goes in, a schema-valid [`Plan`] comes out.
//!
//! ```text
//! raw JSON ──► schema gate ──► typed check ──► Valid(plan)
//!                  │ fail
//!                  ▼
//!          per-field repairs ──► re-check ──► Repaired { plan, repairs }
//!                  │ no usable effects / re-check fails
//!                  ▼
//!           Fallback { reason }  (fixed safe plan)
//! ```

pub mod repair;
pub mod schema;
pub mod validator;

pub use bruno_core::Plan;
pub use schema::{plan_schema, schema_accepts};
pub use validator::{validate_or_repair, validate_or_repair_plan, PlanVerdict};

use thiserror::Error;

/// Validation errors
///
/// Internal only: the validator maps every failure to a repair or the
/// fallback plan.
#[derive(Error, Debug, Clone)]
pub enum PlanError {
    #[error("Schema compilation failed: {0}")]
    Schema(String),

    #[error("Plan does not match schema: {0}")]
    Invalid(String),
}
