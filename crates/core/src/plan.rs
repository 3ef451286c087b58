//! Action plan schema
//!
//! A plan is the structured command dispatched to the robot: an intent label
//! plus one to five timed effects, each targeting one addressable part.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent used when the planner gives none
pub const DEFAULT_INTENT: &str = "EMOTE_OR_ACTION";

/// Numeric bounds and defaults of the effect schema
pub mod bounds {
    /// Minimum effects in a plan
    pub const MIN_EFFECTS: usize = 1;
    /// Maximum effects in a plan
    pub const MAX_EFFECTS: usize = 5;

    pub const HZ_MIN: f64 = 0.1;
    pub const HZ_MAX: f64 = 30.0;
    pub const DEFAULT_HZ: f64 = 6.0;

    pub const DUTY_MIN: f64 = 0.0;
    pub const DUTY_MAX: f64 = 1.0;
    pub const DEFAULT_DUTY: f64 = 0.5;

    pub const DURATION_MS_MIN: u32 = 50;
    pub const DURATION_MS_MAX: u32 = 60_000;
    pub const DEFAULT_DURATION_MS: u32 = 1500;
}

/// Addressable part of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Tail,
    Head,
    LeftEar,
    RightEar,
    LeftEye,
    RightEye,
    Chest,
    Back,
    LeftLeg,
    RightLeg,
}

impl Part {
    pub const ALL: [Part; 10] = [
        Part::Tail,
        Part::Head,
        Part::LeftEar,
        Part::RightEar,
        Part::LeftEye,
        Part::RightEye,
        Part::Chest,
        Part::Back,
        Part::LeftLeg,
        Part::RightLeg,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Tail => "tail",
            Part::Head => "head",
            Part::LeftEar => "left_ear",
            Part::RightEar => "right_ear",
            Part::LeftEye => "left_eye",
            Part::RightEye => "right_eye",
            Part::Chest => "chest",
            Part::Back => "back",
            Part::LeftLeg => "left_leg",
            Part::RightLeg => "right_leg",
        }
    }

    /// Parse a wire name (exact match)
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|part| part.as_str() == name)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour applied to a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    On,
    Off,
    Blink,
    Pulse,
    Wag,
    Chase,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::On,
        Mode::Off,
        Mode::Blink,
        Mode::Pulse,
        Mode::Wag,
        Mode::Chase,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::On => "on",
            Mode::Off => "off",
            Mode::Blink => "blink",
            Mode::Pulse => "pulse",
            Mode::Wag => "wag",
            Mode::Chase => "chase",
        }
    }

    /// Parse a wire name (exact match)
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_hz() -> f64 {
    bounds::DEFAULT_HZ
}

fn default_duty() -> f64 {
    bounds::DEFAULT_DUTY
}

fn default_duration_ms() -> u32 {
    bounds::DEFAULT_DURATION_MS
}

/// One atomic actuation directive
///
/// Optional numeric fields take their documented defaults when absent on input;
/// they are always populated on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Effect {
    pub part: Part,
    pub mode: Mode,
    #[serde(default = "default_hz")]
    pub hz: f64,
    #[serde(default = "default_duty")]
    pub duty: f64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
}

impl Effect {
    /// Effect with default timing
    pub fn new(part: Part, mode: Mode) -> Self {
        Self {
            part,
            mode,
            hz: bounds::DEFAULT_HZ,
            duty: bounds::DEFAULT_DUTY,
            duration_ms: bounds::DEFAULT_DURATION_MS,
        }
    }

    /// Check numeric fields against the schema bounds
    pub fn check(&self) -> Result<(), String> {
        if !(bounds::HZ_MIN..=bounds::HZ_MAX).contains(&self.hz) {
            return Err(format!("hz {} outside [{}, {}]", self.hz, bounds::HZ_MIN, bounds::HZ_MAX));
        }
        if !(bounds::DUTY_MIN..=bounds::DUTY_MAX).contains(&self.duty) {
            return Err(format!(
                "duty {} outside [{}, {}]",
                self.duty,
                bounds::DUTY_MIN,
                bounds::DUTY_MAX
            ));
        }
        if !(bounds::DURATION_MS_MIN..=bounds::DURATION_MS_MAX).contains(&self.duration_ms) {
            return Err(format!(
                "duration_ms {} outside [{}, {}]",
                self.duration_ms,
                bounds::DURATION_MS_MIN,
                bounds::DURATION_MS_MAX
            ));
        }
        Ok(())
    }
}

/// Structured action command for the robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub intent: String,
    pub effects: Vec<Effect>,
}

impl Plan {
    /// The fixed safe plan: wag the tail for 1.5s
    pub fn fallback() -> Self {
        Self {
            intent: DEFAULT_INTENT.to_string(),
            effects: vec![Effect::new(Part::Tail, Mode::Wag)],
        }
    }

    /// Check the typed invariants: effect count and per-effect bounds
    pub fn check(&self) -> Result<(), String> {
        let count = self.effects.len();
        if !(bounds::MIN_EFFECTS..=bounds::MAX_EFFECTS).contains(&count) {
            return Err(format!(
                "effects has {} entries, expected {}..={}",
                count,
                bounds::MIN_EFFECTS,
                bounds::MAX_EFFECTS
            ));
        }
        for (index, effect) in self.effects.iter().enumerate() {
            effect
                .check()
                .map_err(|e| format!("effects[{}]: {}", index, e))?;
        }
        Ok(())
    }

    /// Whether every invariant holds
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}
