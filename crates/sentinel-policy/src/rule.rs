// rule.rs - Canonical (internal) rule and pattern model.
//
// This is the shape the builder works with. It serializes in camelCase so
// saved selections stay readable; the snake_case shape consumed by the
// enforcement runtime lives in `wire.rs`.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::taint::{StaticAction, TaintAction, TaintClass};

/// One step of a sequence pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub class: TaintClass,
}

/// Ordered list of taint classes that must appear, optionally within
/// `max_distance` calls of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePattern {
    pub steps: Vec<SequenceStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<u64>,
}

/// A single logic predicate. Canonical predicates carry at least one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_has_class: Option<TaintClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tool_class: Option<TaintClass>,
}

impl Predicate {
    pub fn session_has(class: TaintClass) -> Self {
        Self {
            session_has_class: Some(class),
            current_tool_class: None,
        }
    }

    pub fn current_tool(class: TaintClass) -> Self {
        Self {
            session_has_class: None,
            current_tool_class: Some(class),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.session_has_class.is_none() && self.current_tool_class.is_none()
    }

    /// Classes this predicate mentions, in key order.
    pub fn classes(&self) -> impl Iterator<Item = TaintClass> {
        self.session_has_class
            .into_iter()
            .chain(self.current_tool_class)
    }
}

/// AND/OR branches of a logic pattern. A branch is `None` rather than empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogicCondition {
    #[serde(rename = "AND", default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<Predicate>>,
    #[serde(rename = "OR", default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<Predicate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogicPattern {
    pub condition: LogicCondition,
}

impl LogicPattern {
    /// Every predicate across both branches, AND first.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.condition
            .and
            .iter()
            .flatten()
            .chain(self.condition.or.iter().flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Pattern {
    Sequence(SequencePattern),
    Logic(LogicPattern),
}

/// Whether a rule targets a tool/class directly or reacts to a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Simple,
    Pattern,
}

/// A taint rule in canonical form.
///
/// `tool` and `tool_class` are kept as separate optional fields rather than
/// one enum so that imported rules which set both (or neither) survive a
/// round trip unchanged. Rules authored through [`Rule::for_tool`] or
/// [`Rule::for_class`] always set exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
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
    pub pattern: Option<Pattern>,
}

impl Rule {
    fn bare(action: TaintAction) -> Self {
        Self {
            action,
            tool: None,
            tool_class: None,
            tag: None,
            forbidden_tags: Vec::new(),
            error: None,
            pattern: None,
        }
    }

    pub fn for_tool(action: TaintAction, tool: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            ..Self::bare(action)
        }
    }

    pub fn for_class(action: TaintAction, class: TaintClass) -> Self {
        Self {
            tool_class: Some(class),
            ..Self::bare(action)
        }
    }

    pub fn for_pattern(action: TaintAction, pattern: Pattern) -> Self {
        Self {
            pattern: Some(pattern),
            ..Self::bare(action)
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_forbidden_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn kind(&self) -> RuleKind {
        if self.pattern.is_some() {
            RuleKind::Pattern
        } else {
            RuleKind::Simple
        }
    }

    /// Check the authoring invariant: a simple rule names exactly one of a
    /// tool or a tool class. Pattern rules carry no direct target.
    pub fn validate_target(&self) -> Result<(), PolicyError> {
        let has_tool = self.tool.as_deref().is_some_and(|t| !t.is_empty());
        let has_class = self.tool_class.is_some();
        match (self.kind(), has_tool, has_class) {
            (RuleKind::Simple, true, false) | (RuleKind::Simple, false, true) => Ok(()),
            (RuleKind::Simple, true, true) => Err(PolicyError::InvalidTarget {
                reason: "rule sets both tool and tool_class".to_string(),
            }),
            (RuleKind::Simple, false, false) => Err(PolicyError::InvalidTarget {
                reason: "rule sets neither tool nor tool_class".to_string(),
            }),
            (RuleKind::Pattern, false, false) => Ok(()),
            (RuleKind::Pattern, _, _) => Err(PolicyError::InvalidTarget {
                reason: "pattern rule must not also target a tool or tool_class".to_string(),
            }),
        }
    }
}

/// A rule with its identity and provenance. The id is assigned once by the
/// [`IdentityAssigner`](crate::identity::IdentityAssigner) and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRule {
    pub id: String,
    pub source_template: String,
    #[serde(flatten)]
    pub rule: Rule,
}

impl Deref for TemplateRule {
    type Target = Rule;

    fn deref(&self) -> &Rule {
        &self.rule
    }
}

/// A named, immutable bundle of rules and default static gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTemplate {
    pub name: String,
    pub description: String,
    /// Per-tool gates in file order.
    #[serde(default)]
    pub static_rules: Vec<(String, StaticAction)>,
    pub taint_rules: Vec<TemplateRule>,
}

impl RuleTemplate {
    /// Tools the template allows, in file order.
    pub fn allowed_tools(&self) -> impl Iterator<Item = &str> {
        self.static_rules
            .iter()
            .filter(|(_, action)| *action == StaticAction::Allow)
            .map(|(tool, _)| tool.as_str())
    }

    pub fn static_action(&self, tool: &str) -> Option<StaticAction> {
        self.static_rules
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, action)| *action)
    }
}
