//! Core traits and types for the Bruno voice command pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Audio frame and utterance types
//! - The action plan schema (plan, effect, part, mode) and its bounds
//! - Collaborator traits for pluggable backends (STT, planner, dispatch)
//! - Error types

pub mod audio;
pub mod error;
pub mod plan;
pub mod traits;

pub use audio::{AudioFrame, SampleRate, Utterance};
pub use error::{Error, Result};
pub use plan::{bounds, Effect, Mode, Part, Plan, DEFAULT_INTENT};

pub use traits::{ActionPlanner, DispatchReceipt, PlanDispatcher, SpeechToText};
