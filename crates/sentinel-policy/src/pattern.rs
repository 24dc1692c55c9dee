// pattern.rs - Pattern normalization between wire and canonical shapes.
//
// Reading is generous: camelCase or snake_case keys, `Class` for `class`,
// lowercase `and`/`or`, null entries. Writing is minimal: no empty AND/OR
// branches, no null max_distance. That asymmetry is what makes
// `normalize(denormalize(p)) == p` hold for every canonical pattern.
//
// In lenient mode malformed pieces are dropped and logged. In strict mode the
// first malformed piece is returned as a `PolicyError`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::rule::{
    LogicCondition, LogicPattern, Pattern, Predicate, SequencePattern, SequenceStep,
};
use crate::taint::TaintClass;
use crate::wire::{first_present, first_str, WireCondition, WirePattern, WirePredicate, WireStep};

/// How the readers treat input they cannot fully understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Drop the malformed piece, log it, keep going.
    #[default]
    Lenient,
    /// Reject the input with a typed error.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternNormalizer {
    mode: ParseMode,
}

impl PatternNormalizer {
    pub fn new(mode: ParseMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Absorb `err` in lenient mode, return it in strict mode.
    pub(crate) fn tolerate(&self, err: PolicyError) -> Result<(), PolicyError> {
        match self.mode {
            ParseMode::Strict => Err(err),
            ParseMode::Lenient => {
                tracing::warn!(error = %err, "ignoring malformed rule input");
                Ok(())
            }
        }
    }

    /// Dispatch on the `type` discriminant. Anything other than "sequence"
    /// or "logic" is "no pattern".
    pub fn normalize(&self, wire: &Value) -> Result<Option<Pattern>, PolicyError> {
        match wire.get("type").and_then(Value::as_str) {
            Some("sequence") => Ok(self.normalize_sequence(wire)?.map(Pattern::Sequence)),
            Some("logic") => Ok(self.normalize_logic(wire)?.map(Pattern::Logic)),
            other => {
                self.tolerate(PolicyError::UnknownPatternType {
                    found: other.unwrap_or("<missing>").to_string(),
                })?;
                Ok(None)
            }
        }
    }

    pub fn normalize_sequence(&self, wire: &Value) -> Result<Option<SequencePattern>, PolicyError> {
        let Some(raw_steps) = wire.get("steps").and_then(Value::as_array) else {
            self.tolerate(malformed("sequence", "`steps` is missing or not a list"))?;
            return Ok(None);
        };

        let mut steps = Vec::with_capacity(raw_steps.len());
        for entry in raw_steps {
            match first_str(entry, &["class", "Class"]) {
                Some(name) => match name.parse::<TaintClass>() {
                    Ok(class) => steps.push(SequenceStep { class }),
                    Err(err) => self.tolerate(err)?,
                },
                None => self.tolerate(malformed("sequence", "step has no class"))?,
            }
        }

        let max_distance = match first_present(wire, &["maxDistance", "max_distance"]) {
            Some(raw) => match raw.as_u64() {
                Some(distance) => Some(distance),
                None => {
                    self.tolerate(malformed(
                        "sequence",
                        "max_distance is not a non-negative integer",
                    ))?;
                    None
                }
            },
            None => None,
        };

        Ok(Some(SequencePattern {
            steps,
            max_distance,
        }))
    }

    pub fn normalize_logic(&self, wire: &Value) -> Result<Option<LogicPattern>, PolicyError> {
        if !wire.is_object() {
            self.tolerate(malformed("logic", "pattern is not a mapping"))?;
            return Ok(None);
        }

        let condition = match first_present(wire, &["condition"]) {
            Some(condition) if condition.is_object() => Some(condition),
            Some(_) => {
                self.tolerate(malformed("logic", "`condition` is not a mapping"))?;
                None
            }
            None => None,
        };

        let and = self.normalize_branch(condition.and_then(|c| first_present(c, &["AND", "and"])))?;
        let or = self.normalize_branch(condition.and_then(|c| first_present(c, &["OR", "or"])))?;

        Ok(Some(LogicPattern {
            condition: LogicCondition { and, or },
        }))
    }

    fn normalize_branch(&self, raw: Option<&Value>) -> Result<Option<Vec<Predicate>>, PolicyError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let Some(entries) = raw.as_array() else {
            self.tolerate(malformed("logic", "condition branch is not a list"))?;
            return Ok(None);
        };

        let mut predicates = Vec::with_capacity(entries.len());
        for entry in entries.iter().filter(|e| !e.is_null()) {
            let predicate = Predicate {
                session_has_class: self
                    .predicate_class(entry, &["session_has_class", "sessionHasClass"])?,
                current_tool_class: self
                    .predicate_class(entry, &["current_tool_class", "currentToolClass"])?,
            };
            if predicate.is_empty() {
                self.tolerate(malformed("logic", "predicate names no recognized class"))?;
                continue;
            }
            predicates.push(predicate);
        }

        Ok((!predicates.is_empty()).then_some(predicates))
    }

    fn predicate_class(
        &self,
        entry: &Value,
        keys: &[&str],
    ) -> Result<Option<TaintClass>, PolicyError> {
        match first_str(entry, keys) {
            Some(name) => match name.parse::<TaintClass>() {
                Ok(class) => Ok(Some(class)),
                Err(err) => {
                    self.tolerate(err)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Emit the wire form of a canonical pattern, populated keys only.
    pub fn denormalize(pattern: &Pattern) -> WirePattern {
        match pattern {
            Pattern::Sequence(sequence) => WirePattern::Sequence {
                steps: sequence
                    .steps
                    .iter()
                    .map(|step| WireStep { class: step.class })
                    .collect(),
                max_distance: sequence.max_distance,
            },
            Pattern::Logic(logic) => WirePattern::Logic {
                condition: WireCondition {
                    and: denormalize_branch(logic.condition.and.as_deref()),
                    or: denormalize_branch(logic.condition.or.as_deref()),
                },
            },
        }
    }
}

fn denormalize_branch(branch: Option<&[Predicate]>) -> Vec<WirePredicate> {
    branch
        .unwrap_or_default()
        .iter()
        .filter(|predicate| !predicate.is_empty())
        .map(|predicate| WirePredicate {
            session_has_class: predicate.session_has_class,
            current_tool_class: predicate.current_tool_class,
        })
        .collect()
}

fn malformed(kind: &'static str, reason: &str) -> PolicyError {
    PolicyError::MalformedPattern {
        kind,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lenient() -> PatternNormalizer {
        PatternNormalizer::new(ParseMode::Lenient)
    }

    fn round_trip(pattern: &Pattern) -> Option<Pattern> {
        let wire = serde_json::to_value(PatternNormalizer::denormalize(pattern)).unwrap();
        lenient().normalize(&wire).unwrap()
    }

    #[test]
    fn capitalized_class_and_snake_case_distance() {
        let pattern = lenient()
            .normalize(&json!({
                "type": "sequence",
                "steps": [{"Class": "UNSAFE_EXECUTE"}],
                "max_distance": 3,
            }))
            .unwrap()
            .unwrap();
        let canonical = serde_json::to_value(&pattern).unwrap();
        assert_eq!(
            canonical,
            json!({
                "type": "sequence",
                "steps": [{"class": "UNSAFE_EXECUTE"}],
                "maxDistance": 3,
            })
        );
    }

    #[test]
    fn sequence_without_steps_is_no_pattern() {
        assert_eq!(
            lenient()
                .normalize_sequence(&json!({"type": "sequence"}))
                .unwrap(),
            None
        );
        assert_eq!(
            lenient()
                .normalize_sequence(&json!({"type": "sequence", "steps": "SAFE_READ"}))
                .unwrap(),
            None
        );
    }

    #[test]
    fn sequence_drops_unresolvable_steps() {
        let sequence = lenient()
            .normalize_sequence(&json!({
                "steps": [{"class": "SAFE_READ"}, {}, {"class": "BOGUS"}, {"Class": "SANITIZER"}],
            }))
            .unwrap()
            .unwrap();
        assert_eq!(
            sequence.steps,
            vec![
                SequenceStep {
                    class: TaintClass::SafeRead
                },
                SequenceStep {
                    class: TaintClass::Sanitizer
                },
            ]
        );
        assert_eq!(sequence.max_distance, None);
    }

    #[test]
    fn camel_case_distance_wins_over_snake_case() {
        let sequence = lenient()
            .normalize_sequence(&json!({
                "steps": [],
                "maxDistance": 2,
                "max_distance": 9,
            }))
            .unwrap()
            .unwrap();
        assert_eq!(sequence.max_distance, Some(2));
    }

    #[test]
    fn logic_accepts_lowercase_branches_and_both_key_styles() {
        let logic = lenient()
            .normalize_logic(&json!({
                "type": "logic",
                "condition": {
                    "and": [{"session_has_class": "SENSITIVE_READ"}, null],
                    "OR": [{"currentToolClass": "CONSEQUENTIAL_WRITE"}],
                },
            }))
            .unwrap()
            .unwrap();
        assert_eq!(
            logic.condition.and,
            Some(vec![Predicate::session_has(TaintClass::SensitiveRead)])
        );
        assert_eq!(
            logic.condition.or,
            Some(vec![Predicate::current_tool(TaintClass::ConsequentialWrite)])
        );
    }

    #[test]
    fn logic_omits_branches_that_map_to_nothing() {
        let logic = lenient()
            .normalize_logic(&json!({
                "type": "logic",
                "condition": {"AND": [null, {"unrelated": 1}], "OR": []},
            }))
            .unwrap()
            .unwrap();
        assert_eq!(logic.condition, LogicCondition::default());
    }

    #[test]
    fn unknown_type_is_no_pattern_in_lenient_mode() {
        assert_eq!(lenient().normalize(&json!({"type": "regex"})).unwrap(), None);
        assert_eq!(lenient().normalize(&json!({"steps": []})).unwrap(), None);
    }

    #[test]
    fn strict_mode_reports_bad_step_class() {
        let err = PatternNormalizer::new(ParseMode::Strict)
            .normalize(&json!({"type": "sequence", "steps": [{"class": "BOGUS"}]}))
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownTaintClass { .. }));
    }

    #[test]
    fn denormalize_emits_populated_keys_only() {
        let logic = Pattern::Logic(LogicPattern {
            condition: LogicCondition {
                and: Some(vec![Predicate::session_has(TaintClass::SensitiveRead)]),
                or: None,
            },
        });
        assert_eq!(
            serde_json::to_value(PatternNormalizer::denormalize(&logic)).unwrap(),
            json!({
                "type": "logic",
                "condition": {"AND": [{"session_has_class": "SENSITIVE_READ"}]},
            })
        );

        let sequence = Pattern::Sequence(SequencePattern {
            steps: vec![SequenceStep {
                class: TaintClass::SafeRead,
            }],
            max_distance: None,
        });
        assert_eq!(
            serde_json::to_value(PatternNormalizer::denormalize(&sequence)).unwrap(),
            json!({"type": "sequence", "steps": [{"class": "SAFE_READ"}]})
        );
    }

    #[test]
    fn canonical_patterns_survive_round_trip() {
        let patterns = [
            Pattern::Sequence(SequencePattern {
                steps: vec![
                    SequenceStep {
                        class: TaintClass::SensitiveRead,
                    },
                    SequenceStep {
                        class: TaintClass::ConsequentialWrite,
                    },
                ],
                max_distance: Some(5),
            }),
            Pattern::Sequence(SequencePattern {
                steps: vec![],
                max_distance: None,
            }),
            Pattern::Logic(LogicPattern {
                condition: LogicCondition {
                    and: Some(vec![
                        Predicate::session_has(TaintClass::SensitiveRead),
                        Predicate {
                            session_has_class: Some(TaintClass::SafeRead),
                            current_tool_class: Some(TaintClass::UnsafeExecute),
                        },
                    ]),
                    or: Some(vec![Predicate::current_tool(TaintClass::HumanVerify)]),
                },
            }),
            Pattern::Logic(LogicPattern::default()),
        ];
        for pattern in &patterns {
            assert_eq!(round_trip(pattern).as_ref(), Some(pattern));
        }
    }
}
