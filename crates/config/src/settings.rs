//! Main settings module

use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{audio, controller, endpointing, endpoints, llm, timeouts, wake};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Audio capture and voice activity gating
    #[serde(default)]
    pub audio: AudioSettings,

    /// Utterance endpointing
    #[serde(default)]
    pub endpointing: EndpointingSettings,

    /// Wake phrase matching
    #[serde(default)]
    pub wake: WakeSettings,

    /// Speech recognizer sidecar
    #[serde(default)]
    pub stt: SttSettings,

    /// Plan generation
    #[serde(default)]
    pub llm: LlmSettings,

    /// Actuator dispatch
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Controller pacing
    #[serde(default)]
    pub controller: ControllerSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// What the capture producer does when the frame queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowMode {
    /// Evict the oldest queued frame
    #[default]
    DropOldest,
    /// Wait up to `block_timeout_ms` for room, then drop the new frame
    Block,
}

/// Audio capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u32,
    /// RMS threshold on the PCM16 scale
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowMode,
    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,
    /// Input device name (system default when unset)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 {
    audio::SAMPLE_RATE
}
fn default_frame_duration_ms() -> u32 {
    audio::FRAME_MS
}
fn default_energy_threshold() -> f32 {
    audio::ENERGY_THRESHOLD
}
fn default_queue_capacity() -> usize {
    audio::QUEUE_CAPACITY
}
fn default_block_timeout_ms() -> u64 {
    audio::BLOCK_TIMEOUT_MS
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_duration_ms: default_frame_duration_ms(),
            energy_threshold: default_energy_threshold(),
            queue_capacity: default_queue_capacity(),
            overflow: OverflowMode::default(),
            block_timeout_ms: default_block_timeout_ms(),
            device: None,
        }
    }
}

impl AudioSettings {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms as u64)
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }
}

/// Utterance endpointing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointingSettings {
    #[serde(default = "default_min_utterance_ms")]
    pub min_utterance_ms: u64,
    #[serde(default = "default_max_utterance_ms")]
    pub max_utterance_ms: u64,
    #[serde(default = "default_silence_hold_ms")]
    pub silence_hold_ms: u64,
}

fn default_min_utterance_ms() -> u64 {
    endpointing::MIN_UTTERANCE_MS
}
fn default_max_utterance_ms() -> u64 {
    endpointing::MAX_UTTERANCE_MS
}
fn default_silence_hold_ms() -> u64 {
    endpointing::SILENCE_HOLD_MS
}

impl Default for EndpointingSettings {
    fn default() -> Self {
        Self {
            min_utterance_ms: default_min_utterance_ms(),
            max_utterance_ms: default_max_utterance_ms(),
            silence_hold_ms: default_silence_hold_ms(),
        }
    }
}

impl EndpointingSettings {
    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_utterance_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_utterance_ms)
    }

    pub fn silence_hold(&self) -> Duration {
        Duration::from_millis(self.silence_hold_ms)
    }
}

/// Wake phrase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeSettings {
    /// Ordered wake phrases; earlier phrases are stripped first
    #[serde(default = "default_wake_phrases")]
    pub phrases: Vec<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Residual words after stripping needed to skip the command phase
    #[serde(default = "default_min_inline_words")]
    pub min_inline_words: usize,
    #[serde(default = "default_command")]
    pub default_command: String,
}

fn default_wake_phrases() -> Vec<String> {
    wake::PHRASES.iter().map(|p| p.to_string()).collect()
}
fn default_debounce_ms() -> u64 {
    wake::DEBOUNCE_MS
}
fn default_min_inline_words() -> usize {
    wake::MIN_INLINE_WORDS
}
fn default_command() -> String {
    wake::DEFAULT_COMMAND.to_string()
}

impl Default for WakeSettings {
    fn default() -> Self {
        Self {
            phrases: default_wake_phrases(),
            debounce_ms: default_debounce_ms(),
            min_inline_words: default_min_inline_words(),
            default_command: default_command(),
        }
    }
}

impl WakeSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Speech recognizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    #[serde(default = "default_stt_url")]
    pub url: String,
    #[serde(default = "default_stt_language")]
    pub language: String,
    #[serde(default = "default_stt_timeout_ms")]
    pub timeout_ms: u64,
    /// Shorter utterances are treated as silence (samples at 16kHz)
    #[serde(default = "default_min_audio_samples")]
    pub min_audio_samples: usize,
}

fn default_stt_url() -> String {
    endpoints::STT_DEFAULT.to_string()
}
fn default_stt_language() -> String {
    "en".to_string()
}
fn default_stt_timeout_ms() -> u64 {
    timeouts::STT_MS
}
fn default_min_audio_samples() -> usize {
    1600
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            url: default_stt_url(),
            language: default_stt_language(),
            timeout_ms: default_stt_timeout_ms(),
            min_audio_samples: default_min_audio_samples(),
        }
    }
}

impl SttSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Planner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_llm_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_llm_model() -> String {
    llm::MODEL.to_string()
}
fn default_llm_temperature() -> f32 {
    llm::TEMPERATURE
}
fn default_llm_timeout_ms() -> u64 {
    timeouts::LLM_MS
}
fn default_keep_alive() -> String {
    llm::KEEP_ALIVE.to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_ms: default_llm_timeout_ms(),
            keep_alive: default_keep_alive(),
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Actuator dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_dispatch_url")]
    pub url: String,
    #[serde(default = "default_dispatch_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_dispatch_url() -> String {
    endpoints::ACTUATOR_DEFAULT.to_string()
}
fn default_dispatch_timeout_ms() -> u64 {
    timeouts::DISPATCH_MS
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            url: default_dispatch_url(),
            timeout_ms: default_dispatch_timeout_ms(),
        }
    }
}

impl DispatchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Controller pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    #[serde(default = "default_rearm_delay_ms")]
    pub rearm_delay_ms: u64,
}

fn default_rearm_delay_ms() -> u64 {
    controller::REARM_DELAY_MS
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            rearm_delay_ms: default_rearm_delay_ms(),
        }
    }
}

impl ControllerSettings {
    pub fn rearm_delay(&self) -> Duration {
        Duration::from_millis(self.rearm_delay_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_audio()?;
        self.validate_endpointing()?;
        self.validate_wake()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;

        if audio.sample_rate == 0 {
            return Err(ConfigError::invalid("audio.sample_rate", "Must be positive"));
        }
        if audio.frame_duration_ms == 0 {
            return Err(ConfigError::invalid("audio.frame_duration_ms", "Must be positive"));
        }
        if !audio.energy_threshold.is_finite() || audio.energy_threshold <= 0.0 {
            return Err(ConfigError::invalid(
                "audio.energy_threshold",
                format!("Must be a positive number, got {}", audio.energy_threshold),
            ));
        }
        if audio.queue_capacity == 0 {
            return Err(ConfigError::invalid("audio.queue_capacity", "Must be at least 1"));
        }
        if audio.overflow == OverflowMode::Block && audio.block_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "audio.block_timeout_ms",
                "Must be positive when overflow = \"block\"",
            ));
        }

        Ok(())
    }

    fn validate_endpointing(&self) -> Result<(), ConfigError> {
        let ep = &self.endpointing;

        if ep.max_utterance_ms == 0 {
            return Err(ConfigError::invalid("endpointing.max_utterance_ms", "Must be positive"));
        }
        if ep.min_utterance_ms > ep.max_utterance_ms {
            return Err(ConfigError::invalid(
                "endpointing.min_utterance_ms",
                format!(
                    "Must not exceed max_utterance_ms ({} > {})",
                    ep.min_utterance_ms, ep.max_utterance_ms
                ),
            ));
        }

        Ok(())
    }

    fn validate_wake(&self) -> Result<(), ConfigError> {
        let wake = &self.wake;

        if wake.phrases.is_empty() {
            return Err(ConfigError::invalid("wake.phrases", "At least one phrase is required"));
        }
        if let Some(index) = wake.phrases.iter().position(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "wake.phrases",
                format!("Phrase {} is blank", index),
            ));
        }
        if wake.min_inline_words == 0 {
            return Err(ConfigError::invalid("wake.min_inline_words", "Must be at least 1"));
        }
        if wake.default_command.trim().is_empty() {
            return Err(ConfigError::MissingField("wake.default_command".to_string()));
        }

        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("stt.timeout_ms", self.stt.timeout_ms),
            ("llm.timeout_ms", self.llm.timeout_ms),
            ("dispatch.timeout_ms", self.dispatch.timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "Timeout must be positive"));
            }
        }
        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("BRUNO")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("wake.phrases"),
    );

    build_settings(builder)
}

fn build_settings(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigError> {
    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        wake_phrases = settings.wake.phrases.len(),
        frame_ms = settings.audio.frame_duration_ms,
        "Settings loaded"
    );

    Ok(settings)
}
