//! Centralized constants for the voice command pipeline
//!
//! Single source of truth for default values. Settings defaults and the
//! pipeline/planner/dispatch crates all read from here.

/// Audio capture and gating defaults
pub mod audio {
    /// Capture sample rate (Hz)
    pub const SAMPLE_RATE: u32 = 16_000;

    /// Frame duration (ms)
    pub const FRAME_MS: u32 = 30;

    /// RMS threshold on the PCM16 scale; lower is more sensitive
    pub const ENERGY_THRESHOLD: f32 = 100.0;

    /// Bounded frame queue capacity (frames, ~7.7s at 30ms)
    pub const QUEUE_CAPACITY: usize = 256;

    /// Longest a capture callback may block waiting for queue room (ms)
    pub const BLOCK_TIMEOUT_MS: u64 = 5;
}

/// Utterance endpointing defaults
pub mod endpointing {
    /// Silence cannot end an utterance before this (ms)
    pub const MIN_UTTERANCE_MS: u64 = 1500;

    /// Hard ceiling on utterance length (ms)
    pub const MAX_UTTERANCE_MS: u64 = 8000;

    /// Sustained silence that ends an utterance (ms)
    pub const SILENCE_HOLD_MS: u64 = 700;
}

/// Wake phrase defaults
pub mod wake {
    /// Wake phrases, longest first so stripping removes "hey bruno" before "bruno"
    pub const PHRASES: &[&str] = &["hey bruno", "hi bruno", "okay bruno", "tommy", "charlie", "bruno"];

    /// Minimum time between two accepted wakes (ms)
    pub const DEBOUNCE_MS: u64 = 2000;

    /// Residual words needed to treat the wake utterance as a command
    pub const MIN_INLINE_WORDS: usize = 2;

    /// Command used when the command phase hears nothing
    pub const DEFAULT_COMMAND: &str = "wag your tail";
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Whisper STT sidecar
    pub const STT_DEFAULT: &str = "http://127.0.0.1:8090";

    /// Ollama LLM endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Robot command endpoint
    pub const ACTUATOR_DEFAULT: &str = "http://192.168.0.144/command";
}

/// Timeouts for external collaborators
pub mod timeouts {
    /// Speech recognition request (ms)
    pub const STT_MS: u64 = 30_000;

    /// Planner request (ms)
    pub const LLM_MS: u64 = 60_000;

    /// Dispatch request (ms)
    pub const DISPATCH_MS: u64 = 5_000;
}

/// Planner model defaults
pub mod llm {
    pub const MODEL: &str = "phi3.5";
    pub const TEMPERATURE: f32 = 0.0;
    pub const KEEP_ALIVE: &str = "5m";
}

/// Controller pacing
pub mod controller {
    /// Pause after dispatch before listening for the next wake (ms)
    pub const REARM_DELAY_MS: u64 = 400;
}
