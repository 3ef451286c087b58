//! Plan validator
//!
//! `validate_or_repair` never fails. A plan that already satisfies the schema
//! comes back unchanged; anything else is repaired field by field, and if no
//! usable effect survives the fixed fallback plan is returned.

use serde_json::Value;

use bruno_core::Plan;

use crate::repair::{repair_plan, RepairLog};
use crate::schema::{first_violation, schema_accepts};
use crate::PlanError;

/// Outcome of validating a raw plan
#[derive(Debug, Clone, PartialEq)]
pub enum PlanVerdict {
    /// Input satisfied the schema as-is
    Valid(Plan),
    /// Input was repaired; `repairs` lists what changed
    Repaired { plan: Plan, repairs: Vec<String> },
    /// Nothing usable; the fixed safe plan applies
    Fallback { reason: String },
}

impl PlanVerdict {
    /// The plan to dispatch
    pub fn into_plan(self) -> Plan {
        match self {
            PlanVerdict::Valid(plan) | PlanVerdict::Repaired { plan, .. } => plan,
            PlanVerdict::Fallback { .. } => Plan::fallback(),
        }
    }

    /// Short label for logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            PlanVerdict::Valid(_) => "valid",
            PlanVerdict::Repaired { .. } => "repaired",
            PlanVerdict::Fallback { .. } => "fallback",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PlanVerdict::Valid(_))
    }
}

/// Schema gate followed by the typed conversion
fn accept(raw: &Value) -> Result<Plan, PlanError> {
    if !schema_accepts(raw) {
        let violation = first_violation(raw).unwrap_or_else(|| "schema mismatch".to_string());
        return Err(PlanError::Invalid(violation));
    }

    let plan: Plan =
        serde_json::from_value(raw.clone()).map_err(|e| PlanError::Invalid(e.to_string()))?;
    plan.check().map_err(PlanError::Invalid)?;
    Ok(plan)
}

/// Validate a raw plan, repairing or falling back as needed
pub fn validate_or_repair(raw: &Value) -> PlanVerdict {
    let violation = match accept(raw) {
        Ok(plan) => return PlanVerdict::Valid(plan),
        Err(e) => e,
    };
    tracing::debug!(error = %violation, "Plan failed validation, repairing");

    let mut log = RepairLog::default();
    let repaired = repair_plan(raw, &mut log);

    if repaired.effects.is_empty() {
        let reason = "no usable effects".to_string();
        tracing::warn!(reason = %reason, "Using fallback plan");
        return PlanVerdict::Fallback { reason };
    }

    if let Err(e) = repaired.check() {
        let reason = format!("repaired plan still invalid: {}", e);
        tracing::warn!(reason = %reason, "Using fallback plan");
        return PlanVerdict::Fallback { reason };
    }

    let repairs = log.into_entries();
    tracing::warn!(
        intent = %repaired.intent,
        effects = repaired.effects.len(),
        repairs = ?repairs,
        "Plan repaired"
    );
    PlanVerdict::Repaired {
        plan: repaired,
        repairs,
    }
}

/// Validate and return only the plan
pub fn validate_or_repair_plan(raw: &Value) -> Plan {
    validate_or_repair(raw).into_plan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bruno_core::{bounds, Effect, Mode, Part, DEFAULT_INTENT};
    use serde_json::json;

    /// Inputs covering every repair path
    fn hostile_inputs() -> Vec<Value> {
        vec![
            Value::Null,
            json!(true),
            json!(42),
            json!("wag your tail"),
            json!([]),
            json!({}),
            json!({"effects": []}),
            json!({"intent": null, "effects": null}),
            json!({"intent": "X", "effects": "tail"}),
            json!({"intent": "X", "effects": [1, "two", null, []]}),
            json!({"intent": "X", "effects": [{"part": "nose", "mode": "spin", "hz": 999}]}),
            json!({"intent": "X", "effects": [{"hz": "fast", "duty": -1, "duration_ms": 10}]}),
            json!({"intent": "X", "effects": [{"part": "head", "mode": "on", "duration_ms": 1234.56}]}),
            json!({"intent": "X", "effects": [{"part": "head", "mode": "on", "hz": "12", "duty": "0.25"}]}),
            json!({"intent": 5, "effects": [{"part": "chest", "mode": "pulse", "extra": {"a": 1}}]}),
            json!({"intent": "X", "effects": [{}, {}, {}, {}, {}, {}, {}]}),
            json!({"intent": "X", "effects": [{"part": "tail", "mode": "wag"}], "mood": "happy"}),
            json!({"intent": "X", "effects": [{"part": "tail", "mode": "wag", "hz": 1e308, "duty": -1e308}]}),
        ]
    }

    fn assert_in_bounds(plan: &Plan) {
        assert!((bounds::MIN_EFFECTS..=bounds::MAX_EFFECTS).contains(&plan.effects.len()));
        for effect in &plan.effects {
            assert!((bounds::HZ_MIN..=bounds::HZ_MAX).contains(&effect.hz));
            assert!((bounds::DUTY_MIN..=bounds::DUTY_MAX).contains(&effect.duty));
            assert!((bounds::DURATION_MS_MIN..=bounds::DURATION_MS_MAX).contains(&effect.duration_ms));
        }
    }

    #[test]
    fn test_out_of_range_scenario() {
        let raw = json!({"intent": "X", "effects": [{"part": "nose", "mode": "spin", "hz": 999}]});
        let plan = validate_or_repair_plan(&raw);

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({"intent": "X", "effects": [{"part": "tail", "mode": "wag", "hz": 30.0, "duty": 0.5, "duration_ms": 1500}]})
        );
    }

    #[test]
    fn test_empty_effects_fall_back() {
        let verdict = validate_or_repair(&json!({"effects": []}));
        assert!(matches!(verdict, PlanVerdict::Fallback { .. }));
        assert_eq!(verdict.into_plan(), Plan::fallback());
    }

    #[test]
    fn test_identity_on_valid_input() {
        let raw = json!({
            "intent": "GREET",
            "effects": [
                {"part": "tail", "mode": "wag", "hz": 8, "duty": 0.6, "duration_ms": 2000},
                {"part": "left_eye", "mode": "blink", "hz": 0.1, "duty": 0.0, "duration_ms": 50},
                {"part": "chest", "mode": "pulse"}
            ]
        });
        let verdict = validate_or_repair(&raw);
        assert!(verdict.is_valid());

        let plan = verdict.into_plan();
        assert_eq!(plan.intent, "GREET");
        assert_eq!(plan.effects[0].hz, 8.0);
        assert_eq!(plan.effects[1].duration_ms, 50);
        // Omitted optionals come back populated with their defaults
        assert_eq!(plan.effects[2], Effect::new(Part::Chest, Mode::Pulse));
    }

    #[test]
    fn test_fallback_plan_is_valid_input() {
        let raw = serde_json::to_value(Plan::fallback()).unwrap();
        assert_eq!(validate_or_repair(&raw), PlanVerdict::Valid(Plan::fallback()));
    }

    #[test]
    fn test_totality() {
        for raw in hostile_inputs() {
            let plan = validate_or_repair_plan(&raw);
            assert_in_bounds(&plan);
        }
    }

    #[test]
    fn test_idempotence() {
        for raw in hostile_inputs() {
            let once = validate_or_repair_plan(&raw);
            let again = validate_or_repair(&serde_json::to_value(&once).unwrap());
            assert_eq!(again, PlanVerdict::Valid(once), "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_repairs_are_reported() {
        let raw = json!({"intent": 5, "effects": [{"part": "chest", "mode": "pulse", "extra": 1, "hz": "12"}]});
        match validate_or_repair(&raw) {
            PlanVerdict::Repaired { plan, repairs } => {
                assert_eq!(plan.intent, DEFAULT_INTENT);
                assert_eq!(plan.effects[0].hz, 12.0);
                assert!(repairs.iter().any(|r| r.starts_with("intent")));
                assert!(repairs.iter().any(|r| r.starts_with("effects[0].extra")));
                assert!(repairs.iter().any(|r| r.starts_with("effects[0].hz")));
            },
            other => panic!("expected repair, got {:?}", other),
        }
    }

    #[test]
    fn test_all_unusable_entries_fall_back() {
        let verdict = validate_or_repair(&json!({"intent": "X", "effects": [1, "two", null]}));
        assert_eq!(verdict.kind(), "fallback");
    }

    #[test]
    fn test_empty_objects_become_default_effects() {
        let plan = validate_or_repair_plan(&json!({"intent": "X", "effects": [{}, {}, {}, {}, {}, {}, {}]}));
        assert_eq!(plan.effects.len(), 5);
        assert!(plan.effects.iter().all(|e| *e == Effect::new(Part::Tail, Mode::Wag)));
    }
}
