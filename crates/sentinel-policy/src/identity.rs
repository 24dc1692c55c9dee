// identity.rs - Stable rule identities.
//
// Selection and toggling work by id, so every rule the builder touches
// carries one:
//
// - template rules:  "<templateName>-<index>"
// - imported or hand-authored rules without an id: "imported-<index>-<token>"
//
// The token is a content fingerprint by default (SHA-256 over the rule's wire
// form), which makes re-importing an unchanged file produce the same ids.
// The random strategy keeps the older per-import UUID token.
//
// Ids are not checked for uniqueness at assignment time. Id-keyed lookups
// resolve duplicates last-write-wins; `duplicate_ids` lets callers report them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::rule::{Rule, TemplateRule};
use crate::wire::WireRule;

/// Source template recorded on rules that did not come from a template file.
pub const IMPORTED_SOURCE: &str = "imported";

/// Hex characters of the fingerprint kept in an imported id.
const TOKEN_LEN: usize = 16;

/// How tokens for imported rules are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStrategy {
    /// Deterministic fingerprint of the rule's content.
    #[default]
    Fingerprint,
    /// Fresh UUID v4 per assignment.
    Random,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAssigner {
    strategy: IdentityStrategy,
}

impl IdentityAssigner {
    pub fn new(strategy: IdentityStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> IdentityStrategy {
        self.strategy
    }

    pub fn template_id(template_name: &str, index: usize) -> String {
        format!("{}-{}", template_name, index)
    }

    pub fn imported_id(&self, index: usize, rule: &Rule) -> String {
        let token = match self.strategy {
            IdentityStrategy::Fingerprint => fingerprint(rule),
            IdentityStrategy::Random => Uuid::new_v4().simple().to_string(),
        };
        format!("{}-{}-{}", IMPORTED_SOURCE, index, token)
    }

    /// Wrap a template's rule with its positional id.
    pub fn from_template(template_name: &str, index: usize, rule: Rule) -> TemplateRule {
        TemplateRule {
            id: Self::template_id(template_name, index),
            source_template: template_name.to_string(),
            rule,
        }
    }

    /// Wrap an imported or authored rule, keeping any id it already carries.
    pub fn from_import(
        &self,
        index: usize,
        rule: Rule,
        existing_id: Option<String>,
        source_template: Option<String>,
    ) -> TemplateRule {
        let id = existing_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.imported_id(index, &rule));
        TemplateRule {
            id,
            source_template: source_template.unwrap_or_else(|| IMPORTED_SOURCE.to_string()),
            rule,
        }
    }
}

/// Lowercase hex SHA-256 prefix over the rule's serialized wire form.
///
/// The wire form is used because it is what the runtime sees: two rules that
/// compile to the same entry share a fingerprint.
pub fn fingerprint(rule: &Rule) -> String {
    let wire = WireRule::from(rule);
    // Serializing a plain derive-based struct into a Vec cannot fail.
    let bytes = serde_json::to_vec(&wire).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = format!("{:x}", hasher.finalize());
    digest[..TOKEN_LEN].to_string()
}

/// Ids that occur more than once, in first-seen order.
pub fn duplicate_ids(rules: &[TemplateRule]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) && reported.insert(rule.id.as_str()) {
            duplicates.push(rule.id.clone());
        }
    }
    duplicates
}

/// Index rules by id. A later rule with the same id replaces an earlier one.
pub fn index_by_id(rules: &[TemplateRule]) -> HashMap<&str, &TemplateRule> {
    rules.iter().map(|rule| (rule.id.as_str(), rule)).collect()
}
