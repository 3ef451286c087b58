//! JSON schema of the action plan
//!
//! Built from the typed bounds so the two can never drift apart, and compiled
//! once on first use.

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use bruno_core::{bounds, Mode, Part};

use crate::PlanError;

static COMPILED: Lazy<Result<JSONSchema, PlanError>> = Lazy::new(|| {
    JSONSchema::compile(&plan_schema()).map_err(|e| PlanError::Schema(e.to_string()))
});

/// The plan schema as JSON
pub fn plan_schema() -> Value {
    let parts: Vec<&str> = Part::ALL.iter().map(Part::as_str).collect();
    let modes: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();

    json!({
        "type": "object",
        "required": ["intent", "effects"],
        "properties": {
            "intent": {"type": "string"},
            "effects": {
                "type": "array",
                "minItems": bounds::MIN_EFFECTS,
                "maxItems": bounds::MAX_EFFECTS,
                "items": {
                    "type": "object",
                    "required": ["part", "mode"],
                    "properties": {
                        "part": {"type": "string", "enum": parts},
                        "mode": {"type": "string", "enum": modes},
                        "hz": {"type": "number", "minimum": bounds::HZ_MIN, "maximum": bounds::HZ_MAX},
                        "duty": {"type": "number", "minimum": bounds::DUTY_MIN, "maximum": bounds::DUTY_MAX},
                        "duration_ms": {
                            "type": "integer",
                            "minimum": bounds::DURATION_MS_MIN,
                            "maximum": bounds::DURATION_MS_MAX
                        }
                    },
                    "additionalProperties": false
                }
            }
        },
        "additionalProperties": false
    })
}

/// Whether `raw` satisfies the plan schema
///
/// If the schema itself failed to compile, the typed check downstream is
/// the only gate, so this reports `true` after logging once.
pub fn schema_accepts(raw: &Value) -> bool {
    match COMPILED.as_ref() {
        Ok(schema) => schema.is_valid(raw),
        Err(e) => {
            static LOGGED: std::sync::Once = std::sync::Once::new();
            LOGGED.call_once(|| tracing::error!(error = %e, "Plan schema unavailable"));
            true
        },
    }
}

/// First schema violation, for logging
pub(crate) fn first_violation(raw: &Value) -> Option<String> {
    let schema = COMPILED.as_ref().ok()?;
    let result = schema.validate(raw);
    match result {
        Ok(()) => None,
        Err(mut errors) => errors
            .next()
            .map(|e| format!("{} at {}", e, e.instance_path)),
    }
}
