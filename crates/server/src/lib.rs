//! Bruno voice command service
//!
//! Builds the collaborators from settings and wires them into the controller.
//! The binary in `main.rs` owns tracing, capture lifetime and shutdown.

use std::sync::Arc;

use thiserror::Error;

use bruno_agent::{AgentError, ControllerConfig, PipelineController};
use bruno_config::Settings;
use bruno_core::{ActionPlanner, PlanDispatcher, SpeechToText};
use bruno_llm::{LlmBackend, LlmConfig, LlmError, LlmPlanner, OllamaBackend};
use bruno_pipeline::{CaptureHandle, HttpSttBackend, HttpSttConfig, Listener, PipelineError, UtteranceSource};
use bruno_transport::{HttpDispatcher, TransportError};

/// Startup errors; all of them are fatal
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Capture error: {0}")]
    Capture(#[from] PipelineError),

    #[error("No capture backend compiled in; rebuild with `--features capture`")]
    CaptureUnavailable,

    #[error("Planner error: {0}")]
    Planner(#[from] LlmError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] TransportError),

    #[error("Controller error: {0}")]
    Agent(#[from] AgentError),
}

/// External engines the controller talks to
pub struct Collaborators {
    pub stt: Arc<dyn SpeechToText>,
    pub planner: Arc<dyn ActionPlanner>,
    pub dispatcher: Arc<dyn PlanDispatcher>,
}

/// HTTP clients for recognizer, planner and actuator
///
/// Only builds clients; nothing is contacted here.
pub fn build_collaborators(settings: &Settings) -> Result<Collaborators, ServerError> {
    let stt = HttpSttBackend::new(HttpSttConfig::from(&settings.stt))?;
    let planner = LlmPlanner::from_settings(&settings.llm)?;
    let dispatcher = HttpDispatcher::from_settings(&settings.dispatch)?;

    Ok(Collaborators {
        stt: Arc::new(stt),
        planner: Arc::new(planner),
        dispatcher: Arc::new(dispatcher),
    })
}

/// Log whether the recognizer and planner endpoints answer
///
/// Unreachable services are not fatal: the loop degrades to silence and the
/// fallback plan until they come up.
pub async fn probe_services(settings: &Settings) {
    let stt_up = match HttpSttBackend::new(HttpSttConfig::from(&settings.stt)) {
        Ok(stt) => stt.health_check().await,
        Err(_) => false,
    };
    if stt_up {
        tracing::info!(url = %settings.stt.url, "Recognizer reachable");
    } else {
        tracing::warn!(url = %settings.stt.url, "Recognizer not reachable");
    }

    let planner_up = match OllamaBackend::new(LlmConfig::from(&settings.llm)) {
        Ok(llm) => llm.is_available().await,
        Err(_) => false,
    };
    if planner_up {
        tracing::info!(endpoint = %settings.llm.endpoint, model = %settings.llm.model, "Planner reachable");
    } else {
        tracing::warn!(endpoint = %settings.llm.endpoint, "Planner not reachable");
    }
}

pub fn build_controller<S: UtteranceSource>(
    settings: &Settings,
    source: S,
    collaborators: Collaborators,
) -> PipelineController<S> {
    PipelineController::new(
        source,
        collaborators.stt,
        collaborators.planner,
        collaborators.dispatcher,
        ControllerConfig::from(settings),
    )
}

/// Open the input device and return a listener over its frames
///
/// Keep the handle alive for as long as capture should run.
#[cfg(feature = "capture")]
pub fn start_capture(settings: &Settings) -> Result<(Listener, CaptureHandle), ServerError> {
    use bruno_pipeline::{CpalFrameSource, FrameQueue, FrameSource};

    let queue = Arc::new(FrameQueue::from_settings(&settings.audio));
    let source = CpalFrameSource::from_settings(&settings.audio);
    let handle = source.start(queue.clone())?;
    tracing::info!(device = handle.label(), capacity = queue.capacity(), "Capture started");

    Ok((Listener::from_settings(queue, settings), handle))
}

#[cfg(not(feature = "capture"))]
pub fn start_capture(_settings: &Settings) -> Result<(Listener, CaptureHandle), ServerError> {
    Err(ServerError::CaptureUnavailable)
}
