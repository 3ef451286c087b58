//! Pipeline controller
//!
//! One cycle: `ListenWake → ListenCommand → Plan → Validate → Dispatch →
//! ListenWake`. An inline command skips `ListenCommand`; a planner failure
//! skips `Validate`. Recognizer, planner and dispatch calls are each bounded by
//! their own timeout and are the only suspension points besides capture.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::time::{timeout, Instant};

use bruno_config::Settings;
use bruno_core::{ActionPlanner, Plan, PlanDispatcher, SpeechToText};
use bruno_pipeline::{UtteranceSource, WakeConfig, WakeGate, WakeOutcome, WakeState};
use bruno_plan::validate_or_repair;

use crate::events::{PipelineEvent, PlanSource};
use crate::state::{ControllerState, Phase};
use crate::AgentError;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub wake: WakeConfig,
    /// Used when the command phase hears nothing
    pub default_command: String,
    pub stt_timeout: Duration,
    pub planner_timeout: Duration,
    pub dispatch_timeout: Duration,
    /// Pause after dispatch before listening for the next wake
    pub rearm_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ControllerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            wake: WakeConfig::from(&settings.wake),
            default_command: settings.wake.default_command.clone(),
            stt_timeout: settings.stt.timeout(),
            planner_timeout: settings.llm.timeout(),
            dispatch_timeout: settings.dispatch.timeout(),
            rearm_delay: settings.controller.rearm_delay(),
        }
    }
}

/// Wake-to-dispatch state machine
pub struct PipelineController<S> {
    source: S,
    stt: Arc<dyn SpeechToText>,
    planner: Arc<dyn ActionPlanner>,
    dispatcher: Arc<dyn PlanDispatcher>,
    wake: WakeGate,
    config: ControllerConfig,
    state: ControllerState,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl<S: UtteranceSource> PipelineController<S> {
    pub fn new(
        source: S,
        stt: Arc<dyn SpeechToText>,
        planner: Arc<dyn ActionPlanner>,
        dispatcher: Arc<dyn PlanDispatcher>,
        config: ControllerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            source,
            stt,
            planner,
            dispatcher,
            wake: WakeGate::new(config.wake.clone()),
            config,
            state: ControllerState::ListenWake,
            event_tx,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn wake_state(&self) -> &WakeState {
        self.wake.state()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn transition(&mut self, next: ControllerState) {
        let from = self.state.phase();
        let to = next.phase();
        if from != to {
            tracing::debug!(from = %from, to = %to, "Controller state changed");
            self.emit(PipelineEvent::StateChanged { from, to });
        }
        self.state = next;
    }

    /// Perform exactly one state's work and move to the next state
    ///
    /// Returns the phase now current. Errors only when capture is gone.
    pub async fn step(&mut self) -> Result<Phase, AgentError> {
        let next = match self.state.clone() {
            ControllerState::ListenWake => self.listen_wake().await?,
            ControllerState::ListenCommand => self.listen_command().await?,
            ControllerState::Plan { command } => self.plan(command).await,
            ControllerState::Validate { command, raw } => self.validate(&command, &raw),
            ControllerState::Dispatch { plan, source } => self.dispatch(&plan, source).await,
        };
        self.transition(next);
        Ok(self.state.phase())
    }

    /// Step until `shutdown` turns true or its sender is dropped
    ///
    /// The flag is checked between states and raced against the current
    /// state's work, so an in-flight call is abandoned on shutdown.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), AgentError> {
        tracing::info!(
            stt = self.stt.model_name(),
            planner = self.planner.model_name(),
            dispatcher = self.dispatcher.target(),
            "Controller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                result = self.step() => {
                    result?;
                },
            }
        }

        tracing::info!(state = %self.state.phase(), "Controller stopped");
        Ok(())
    }

    /// Capture one utterance and recognize it
    ///
    /// Recognizer errors and timeouts count as silence.
    async fn capture_text(&self) -> Result<String, AgentError> {
        let utterance = self.source.next_utterance().await?;
        if utterance.is_empty() {
            return Ok(String::new());
        }

        match timeout(self.config.stt_timeout, self.stt.transcribe(&utterance)).await {
            Ok(Ok(text)) => Ok(text.trim().to_string()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Recognizer failed, treating as silence");
                Ok(String::new())
            },
            Err(_) => {
                tracing::warn!(timeout = ?self.config.stt_timeout, "Recognizer timed out, treating as silence");
                Ok(String::new())
            },
        }
    }

    async fn listen_wake(&mut self) -> Result<ControllerState, AgentError> {
        let transcript = self.capture_text().await?;
        if transcript.is_empty() {
            return Ok(ControllerState::ListenWake);
        }

        let now = Instant::now().into_std();
        match self.wake.evaluate(&transcript, now) {
            WakeOutcome::NoMatch => {
                tracing::trace!(transcript = %transcript, "No wake phrase");
                Ok(ControllerState::ListenWake)
            },
            WakeOutcome::Debounced { since_last } => {
                self.emit(PipelineEvent::WakeDebounced {
                    transcript,
                    since_last,
                });
                Ok(ControllerState::ListenWake)
            },
            WakeOutcome::Accepted => {
                tracing::info!(transcript = %transcript, "Wake phrase detected");
                let inline = self.wake.inline_command(&transcript);
                self.emit(PipelineEvent::WakeDetected { transcript });

                match inline {
                    Some(command) => Ok(self.command(command, true, false)),
                    None => Ok(ControllerState::ListenCommand),
                }
            },
        }
    }

    async fn listen_command(&mut self) -> Result<ControllerState, AgentError> {
        let transcript = self.capture_text().await?;
        // People often repeat the name before the command
        let command = self.wake.strip_wake(&transcript);

        if command.is_empty() {
            tracing::debug!(default = %self.config.default_command, "No command heard, using default");
            let default = self.config.default_command.clone();
            return Ok(self.command(default, false, true));
        }
        Ok(self.command(command, false, false))
    }

    fn command(&self, text: String, inline: bool, defaulted: bool) -> ControllerState {
        tracing::info!(command = %text, inline, defaulted, "Command received");
        self.emit(PipelineEvent::Command {
            text: text.clone(),
            inline,
            defaulted,
        });
        ControllerState::Plan { command: text }
    }

    async fn plan(&self, command: String) -> ControllerState {
        match timeout(self.config.planner_timeout, self.planner.plan(&command)).await {
            Ok(Ok(raw)) => ControllerState::Validate { command, raw },
            Ok(Err(e)) => {
                tracing::warn!(command = %command, error = %e, "Planner failed, using fallback plan");
                self.ready(Plan::fallback(), PlanSource::PlannerFailed)
            },
            Err(_) => {
                tracing::warn!(
                    command = %command,
                    timeout = ?self.config.planner_timeout,
                    "Planner timed out, using fallback plan"
                );
                self.ready(Plan::fallback(), PlanSource::PlannerFailed)
            },
        }
    }

    fn validate(&self, command: &str, raw: &Value) -> ControllerState {
        let verdict = validate_or_repair(raw);
        let source = PlanSource::from_verdict(&verdict);
        tracing::debug!(command, verdict = verdict.kind(), "Plan validated");
        self.ready(verdict.into_plan(), source)
    }

    fn ready(&self, plan: Plan, source: PlanSource) -> ControllerState {
        self.emit(PipelineEvent::PlanReady {
            plan: plan.clone(),
            source,
        });
        ControllerState::Dispatch { plan, source }
    }

    async fn dispatch(&self, plan: &Plan, source: PlanSource) -> ControllerState {
        match timeout(self.config.dispatch_timeout, self.dispatcher.send(plan)).await {
            Ok(Ok(receipt)) => {
                tracing::info!(
                    intent = %plan.intent,
                    effects = plan.effects.len(),
                    fallback = source.is_fallback(),
                    status = receipt.status,
                    "Plan dispatched"
                );
                self.emit(PipelineEvent::Dispatched {
                    status: receipt.status,
                    body: receipt.body,
                });
            },
            Ok(Err(e)) => {
                tracing::warn!(dispatcher = self.dispatcher.target(), error = %e, "Dispatch failed");
                self.emit(PipelineEvent::DispatchFailed {
                    reason: e.to_string(),
                });
            },
            Err(_) => {
                let reason = format!("timed out after {:?}", self.config.dispatch_timeout);
                tracing::warn!(dispatcher = self.dispatcher.target(), reason = %reason, "Dispatch failed");
                self.emit(PipelineEvent::DispatchFailed { reason });
            },
        }

        if !self.config.rearm_delay.is_zero() {
            tokio::time::sleep(self.config.rearm_delay).await;
        }
        ControllerState::ListenWake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.wake.default_command = "sit".to_string();
        settings.llm.timeout_ms = 1234;
        settings.controller.rearm_delay_ms = 0;

        let config = ControllerConfig::from(&settings);
        assert_eq!(config.default_command, "sit");
        assert_eq!(config.planner_timeout, Duration::from_millis(1234));
        assert_eq!(config.stt_timeout, Duration::from_secs(30));
        assert_eq!(config.dispatch_timeout, Duration::from_secs(5));
        assert!(config.rearm_delay.is_zero());
        assert_eq!(config.wake.debounce, Duration::from_secs(2));
    }
}
