// wire.rs - The snake_case rule shape shared with the enforcement runtime.
//
// Outgoing data is typed: `WireRule` and friends serialize exactly the keys
// the runtime reads, and omit anything unset. Incoming data is read from a
// loose `serde_json::Value` so that rules written by hand, by older builders
// or by the runtime's own tooling (camelCase or snake_case, capitalized
// step keys) all land in the same canonical `Rule`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::pattern::PatternNormalizer;
use crate::rule::Rule;
use crate::taint::{TaintAction, TaintClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStep {
    pub class: TaintClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WirePredicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_has_class: Option<TaintClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tool_class: Option<TaintClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireCondition {
    #[serde(rename = "AND", default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<WirePredicate>,
    #[serde(rename = "OR", default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<WirePredicate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WirePattern {
    Sequence {
        steps: Vec<WireStep>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_distance: Option<u64>,
    },
    Logic {
        condition: WireCondition,
    },
}

/// A taint rule as written into `taint_rules` of a compiled policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRule {
    pub action: TaintAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_class: Option<TaintClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<WirePattern>,
}

impl From<&Rule> for WireRule {
    /// Rename canonical fields to their wire keys, dropping empty strings
    /// and empty tag lists so only populated fields are emitted.
    fn from(rule: &Rule) -> Self {
        WireRule {
            action: rule.action,
            tool: non_empty(rule.tool.as_deref()),
            tool_class: rule.tool_class,
            tag: non_empty(rule.tag.as_deref()),
            forbidden_tags: rule.forbidden_tags.clone(),
            error: non_empty(rule.error.as_deref()),
            pattern: rule.pattern.as_ref().map(PatternNormalizer::denormalize),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// A rule read from loose input, with whatever identity it already carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub rule: Rule,
    pub id: Option<String>,
    pub source_template: Option<String>,
}

/// Read one rule from loose input.
///
/// Returns `Ok(None)` when lenient parsing had to drop the rule entirely
/// (no usable action). Unknown optional fields degrade to absent.
pub fn parse_rule(
    value: &Value,
    normalizer: &PatternNormalizer,
) -> Result<Option<ParsedRule>, PolicyError> {
    if !value.is_object() {
        normalizer.tolerate(PolicyError::Parse {
            format: "rule",
            reason: "expected a mapping".to_string(),
        })?;
        return Ok(None);
    }

    let action = match first_str(value, &["action"]) {
        Some(raw) => match raw.parse::<TaintAction>() {
            Ok(action) => action,
            Err(err) => {
                normalizer.tolerate(err)?;
                return Ok(None);
            }
        },
        None => {
            normalizer.tolerate(PolicyError::MissingAction)?;
            return Ok(None);
        }
    };

    let tool_class = match first_str(value, &["tool_class", "toolClass"]) {
        Some(raw) => match raw.parse::<TaintClass>() {
            Ok(class) => Some(class),
            Err(err) => {
                normalizer.tolerate(err)?;
                None
            }
        },
        None => None,
    };

    let forbidden_tags = match first_present(value, &["forbidden_tags", "forbiddenTags"]) {
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => {
            normalizer.tolerate(PolicyError::Parse {
                format: "rule",
                reason: "forbidden_tags is not a list".to_string(),
            })?;
            Vec::new()
        }
        None => Vec::new(),
    };

    let pattern = match first_present(value, &["pattern"]) {
        Some(raw) => normalizer.normalize(raw)?,
        None => None,
    };

    let rule = Rule {
        action,
        tool: first_str(value, &["tool"]).map(str::to_string),
        tool_class,
        tag: first_str(value, &["tag"]).map(str::to_string),
        forbidden_tags,
        error: first_str(value, &["error"]).map(str::to_string),
        pattern,
    };

    if let Err(err) = rule.validate_target() {
        // Imported rules may legitimately break the authoring invariant.
        normalizer.tolerate(err)?;
    }

    Ok(Some(ParsedRule {
        rule,
        id: first_str(value, &["id"]).map(str::to_string),
        source_template: first_str(value, &["sourceTemplate", "source_template"])
            .map(str::to_string),
    }))
}

/// First of `keys` whose value is present and not null.
pub(crate) fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

/// First of `keys` whose value is a non-empty string.
pub(crate) fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ParseMode;
    use serde_json::json;

    fn lenient() -> PatternNormalizer {
        PatternNormalizer::new(ParseMode::Lenient)
    }

    fn strict() -> PatternNormalizer {
        PatternNormalizer::new(ParseMode::Strict)
    }

    #[test]
    fn snake_case_simple_rule_reads_into_canonical_fields() {
        let parsed = parse_rule(
            &json!({"tool_class": "SAFE_READ", "action": "ADD_TAINT", "tag": "x"}),
            &lenient(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            parsed.rule,
            Rule::for_class(TaintAction::AddTaint, TaintClass::SafeRead).with_tag("x")
        );
        assert_eq!(parsed.id, None);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let parsed = parse_rule(
            &json!({
                "action": "CHECK_TAINT",
                "toolClass": "CONSEQUENTIAL_WRITE",
                "forbiddenTags": ["pii", "secrets"],
                "id": "custom-1",
                "sourceTemplate": "Data Exfiltration",
            }),
            &lenient(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.rule.tool_class, Some(TaintClass::ConsequentialWrite));
        assert_eq!(parsed.rule.forbidden_tags, vec!["pii", "secrets"]);
        assert_eq!(parsed.id.as_deref(), Some("custom-1"));
        assert_eq!(parsed.source_template.as_deref(), Some("Data Exfiltration"));
    }

    #[test]
    fn unknown_pattern_type_keeps_rest_of_rule() {
        let parsed = parse_rule(
            &json!({"action": "BLOCK_CURRENT", "error": "nope", "pattern": {"type": "regex"}}),
            &lenient(),
        )
        .unwrap()
        .unwrap();
        assert!(parsed.rule.pattern.is_none());
        assert_eq!(parsed.rule.error.as_deref(), Some("nope"));
    }

    #[test]
    fn strict_mode_rejects_unknown_pattern_type() {
        let err = parse_rule(
            &json!({"action": "BLOCK_CURRENT", "pattern": {"type": "regex"}}),
            &strict(),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownPatternType { .. }));
    }

    #[test]
    fn missing_action_drops_rule_leniently_and_errors_strictly() {
        let value = json!({"tool": "read_file", "tag": "x"});
        assert!(parse_rule(&value, &lenient()).unwrap().is_none());
        assert!(matches!(
            parse_rule(&value, &strict()),
            Err(PolicyError::MissingAction)
        ));
    }

    #[test]
    fn unknown_tool_class_degrades_to_absent() {
        let parsed = parse_rule(
            &json!({"action": "ADD_TAINT", "tool_class": "NETWORK", "tag": "x"}),
            &lenient(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.rule.tool_class, None);
        assert_eq!(parsed.rule.tag.as_deref(), Some("x"));
    }

    #[test]
    fn imported_rule_with_both_targets_survives_leniently() {
        let parsed = parse_rule(
            &json!({"action": "ADD_TAINT", "tool": "read_file", "tool_class": "SAFE_READ"}),
            &lenient(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.rule.tool.as_deref(), Some("read_file"));
        assert_eq!(parsed.rule.tool_class, Some(TaintClass::SafeRead));

        let err = parse_rule(
            &json!({"action": "ADD_TAINT", "tool": "read_file", "tool_class": "SAFE_READ"}),
            &strict(),
        )
        .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidTarget { .. }));
    }

    #[test]
    fn wire_rule_omits_unset_fields() {
        let rule = Rule::for_tool(TaintAction::AddTaint, "read_file")
            .with_tag("")
            .with_error("");
        let value = serde_json::to_value(WireRule::from(&rule)).unwrap();
        assert_eq!(value, json!({"action": "ADD_TAINT", "tool": "read_file"}));
    }

    #[test]
    fn first_str_skips_null_and_empty() {
        let value = json!({"class": null, "Class": "SANITIZER"});
        assert_eq!(first_str(&value, &["class", "Class"]), Some("SANITIZER"));
        let value = json!({"class": "", "Class": "SAFE_READ"});
        assert_eq!(first_str(&value, &["class", "Class"]), Some("SAFE_READ"));
    }
}
