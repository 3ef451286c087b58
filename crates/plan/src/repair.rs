//! Per-field repair transforms
//!
//! Each transform takes the raw field (possibly absent) and returns a value
//! inside the schema bounds, noting what it changed in a [`RepairLog`].
//! [`repair_plan`] composes them left to right.

use serde_json::{Map, Value};

use bruno_core::{bounds, Effect, Mode, Part, Plan, DEFAULT_INTENT};

/// Human-readable list of field repairs
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RepairLog {
    entries: Vec<String>,
}

impl RepairLog {
    pub fn note(&mut self, field: &str, what: impl std::fmt::Display) {
        self.entries.push(format!("{}: {}", field, what));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Read a JSON value as a finite number
///
/// Numbers and numeric strings count; anything else is non-numeric.
pub fn as_number(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Intent string, defaulting when missing or not a string
pub fn repair_intent(raw: Option<&Value>, log: &mut RepairLog) -> String {
    match raw {
        Some(Value::String(intent)) => intent.clone(),
        Some(other) => {
            log.note("intent", format!("non-string {} replaced with {}", other, DEFAULT_INTENT));
            DEFAULT_INTENT.to_string()
        },
        None => {
            log.note("intent", format!("missing, defaulted to {}", DEFAULT_INTENT));
            DEFAULT_INTENT.to_string()
        },
    }
}

/// Part, substituting `tail` when not in the allowed set
pub fn repair_part(raw: Option<&Value>, field: &str, log: &mut RepairLog) -> Part {
    match raw.and_then(Value::as_str).and_then(Part::parse) {
        Some(part) => part,
        None => {
            log.note(field, format!("{} replaced with {}", describe(raw), Part::Tail));
            Part::Tail
        },
    }
}

/// Mode, substituting `wag` when not in the allowed set
pub fn repair_mode(raw: Option<&Value>, field: &str, log: &mut RepairLog) -> Mode {
    match raw.and_then(Value::as_str).and_then(Mode::parse) {
        Some(mode) => mode,
        None => {
            log.note(field, format!("{} replaced with {}", describe(raw), Mode::Wag));
            Mode::Wag
        },
    }
}

/// Default when absent or non-numeric, then clamp into `[lo, hi]`
pub fn repair_number(
    raw: Option<&Value>,
    lo: f64,
    hi: f64,
    default: f64,
    field: &str,
    log: &mut RepairLog,
) -> f64 {
    let Some(raw) = raw else {
        return default;
    };

    let Some(value) = as_number(raw) else {
        log.note(field, format!("non-numeric {} defaulted to {}", raw, default));
        return default;
    };

    let clamped = value.clamp(lo, hi);
    if clamped != value {
        log.note(field, format!("{} clamped to {}", value, clamped));
    } else if !raw.is_number() {
        log.note(field, format!("numeric string {} parsed", raw));
    }
    clamped
}

/// Integer duration: default, truncate toward zero, clamp
pub fn repair_duration(raw: Option<&Value>, field: &str, log: &mut RepairLog) -> u32 {
    let lo = bounds::DURATION_MS_MIN as f64;
    let hi = bounds::DURATION_MS_MAX as f64;
    let value = repair_number(raw, lo, hi, bounds::DEFAULT_DURATION_MS as f64, field, log);

    let truncated = value.trunc();
    if truncated != value {
        log.note(field, format!("{} truncated to {}", value, truncated));
    }
    // trunc of a value in [lo, hi] stays in range
    truncated.clamp(lo, hi) as u32
}

/// Rebuild one effect from a raw object; unknown fields are dropped
pub fn repair_effect(index: usize, raw: &Map<String, Value>, log: &mut RepairLog) -> Effect {
    let field = |name: &str| format!("effects[{}].{}", index, name);

    let part = repair_part(raw.get("part"), &field("part"), log);
    let mode = repair_mode(raw.get("mode"), &field("mode"), log);
    let hz = repair_number(
        raw.get("hz"),
        bounds::HZ_MIN,
        bounds::HZ_MAX,
        bounds::DEFAULT_HZ,
        &field("hz"),
        log,
    );
    let duty = repair_number(
        raw.get("duty"),
        bounds::DUTY_MIN,
        bounds::DUTY_MAX,
        bounds::DEFAULT_DUTY,
        &field("duty"),
        log,
    );
    let duration_ms = repair_duration(raw.get("duration_ms"), &field("duration_ms"), log);

    for key in raw.keys() {
        if !matches!(key.as_str(), "part" | "mode" | "hz" | "duty" | "duration_ms") {
            log.note(&field(key.as_str()), "unknown field dropped");
        }
    }

    Effect {
        part,
        mode,
        hz,
        duty,
        duration_ms,
    }
}

/// Repair a whole raw plan
///
/// Missing or non-array `effects` counts as empty; non-object entries are
/// skipped and at most [`bounds::MAX_EFFECTS`] usable entries are kept. The
/// result may have zero effects; the caller substitutes the fallback.
pub fn repair_plan(raw: &Value, log: &mut RepairLog) -> Plan {
    let empty = Map::new();
    let object = match raw.as_object() {
        Some(object) => object,
        None => {
            log.note("plan", format!("expected object, got {}", type_name(raw)));
            &empty
        },
    };

    let intent = repair_intent(object.get("intent"), log);

    let entries: &[Value] = match object.get("effects") {
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            log.note("effects", format!("expected array, got {}", type_name(other)));
            &[]
        },
        None => {
            log.note("effects", "missing");
            &[]
        },
    };

    let mut effects = Vec::with_capacity(bounds::MAX_EFFECTS);
    for (index, entry) in entries.iter().enumerate() {
        let Some(effect) = entry.as_object() else {
            log.note(&format!("effects[{}]", index), format!("{} entry skipped", type_name(entry)));
            continue;
        };
        if effects.len() == bounds::MAX_EFFECTS {
            log.note("effects", format!("truncated to {} entries", bounds::MAX_EFFECTS));
            break;
        }
        effects.push(repair_effect(index, effect, log));
    }

    for key in object.keys() {
        if key != "intent" && key != "effects" {
            log.note(key, "unknown field dropped");
        }
    }

    Plan { intent, effects }
}

fn describe(raw: Option<&Value>) -> String {
    match raw {
        Some(value) => value.to_string(),
        None => "missing".to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
