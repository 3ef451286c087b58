//! Planner prompt
//!
//! The system prompt lists the allowed parts, modes and numeric ranges straight
//! from the plan schema, followed by a few worked examples.

use std::fmt;

use serde::{Deserialize, Serialize};

use bruno_core::{bounds, Mode, Part};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Persona and output rules
pub const SYSTEM_PROMPT_HEADER: &str = "\
You are Bruno's skill planner. Bruno is a loyal, playful robot dog.
Read your owner's spoken command, decide how a real dog would react, and
express that reaction as motor and LED effects.

Reply with a single JSON object and nothing else: no prose, no comments,
no code fences.";

const GUIDELINES: &str = "\
Guidelines:
- \"wag your tail\" -> {\"intent\":\"EMOTE_OR_ACTION\",\"effects\":[{\"part\":\"tail\",\"mode\":\"wag\",\"hz\":6,\"duration_ms\":2000}]}
- \"are you happy?\" -> wag the tail and turn both eyes on for about 2 seconds
- Use 1 to 3 effects. Default duration is 1500 ms.
- If the command is unclear, wag the tail for 1.5 seconds.";

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Full system prompt
pub fn system_prompt() -> String {
    format!(
        "{header}\n\n\
         Output format:\n\
         {{\n  \"intent\": \"EMOTE_OR_ACTION\",\n  \"effects\": [\n    {{ \"part\": \"<one of: {parts}>\",\n      \"mode\": \"<{modes}>\",\n      \
         \"hz\": <optional number {hz_min}..{hz_max}>,\n      \"duty\": <optional {duty_min}..{duty_max}>,\n      \
         \"duration_ms\": <optional integer {dur_min}..{dur_max}> }}\n  ]\n}}\n\
         At most {max_effects} effects.\n\n\
         {guidelines}\n",
        header = SYSTEM_PROMPT_HEADER,
        parts = join(&Part::ALL, ", "),
        modes = join(&Mode::ALL, "|"),
        hz_min = bounds::HZ_MIN,
        hz_max = bounds::HZ_MAX,
        duty_min = bounds::DUTY_MIN,
        duty_max = bounds::DUTY_MAX,
        dur_min = bounds::DURATION_MS_MIN,
        dur_max = bounds::DURATION_MS_MAX,
        max_effects = bounds::MAX_EFFECTS,
        guidelines = GUIDELINES,
    )
}

/// System prompt plus the command as the user turn
pub fn planner_messages(command: &str) -> Vec<Message> {
    vec![Message::system(system_prompt()), Message::user(command)]
}
