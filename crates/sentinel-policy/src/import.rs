// import.rs - Rehydrate a compiled policy file into a working selection.
//
// Accepts JSON or YAML, snake_case (`static_rules`, `taint_rules`) or the
// camelCase keys older exports used. Only the first policy is imported.
// Tools are restored from the catalog with their static action; rules keep
// any id they carry and otherwise receive an imported id. Rules sharing an
// id are all kept.

use serde_json::Value;

use crate::catalog::ToolCatalog;
use crate::error::PolicyError;
use crate::identity::{duplicate_ids, IdentityAssigner};
use crate::pattern::{ParseMode, PatternNormalizer};
use crate::selection::Selection;
use crate::template::parse_static_rules;
use crate::wire::{first_present, first_str, parse_rule};

pub struct PolicyImporter<'a> {
    catalog: &'a ToolCatalog,
    assigner: IdentityAssigner,
    normalizer: PatternNormalizer,
}

impl<'a> PolicyImporter<'a> {
    pub fn new(catalog: &'a ToolCatalog, assigner: IdentityAssigner, mode: ParseMode) -> Self {
        Self {
            catalog,
            assigner,
            normalizer: PatternNormalizer::new(mode),
        }
    }

    /// Parse a policy document (YAML is a superset of the JSON we emit).
    pub fn import_str(&self, text: &str) -> Result<Selection, PolicyError> {
        let document: Value = serde_yaml::from_str(text)?;
        self.import_value(&document)
    }

    pub fn import_value(&self, document: &Value) -> Result<Selection, PolicyError> {
        let mut selection = Selection::new();

        let Some(policy) = first_present(document, &["policies"])
            .and_then(Value::as_array)
            .and_then(|policies| policies.first())
        else {
            tracing::warn!("policy file contains no policies; starting from an empty selection");
            return Ok(selection);
        };

        if let Some(name) = first_str(policy, &["name"]) {
            selection.set_policy_name(name);
        }

        let static_rules = parse_static_rules(
            first_present(policy, &["static_rules", "staticRules"]),
            &self.normalizer,
        )?;
        for (name, action) in &static_rules {
            match self.catalog.get(name) {
                Some(tool) => {
                    selection.add_tool(tool.clone());
                    selection.set_static_action(name, *action);
                }
                None => tracing::warn!(tool = %name, "imported tool is not in the catalog"),
            }
        }

        let raw_rules = first_present(policy, &["taint_rules", "taintRules"])
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for (index, raw) in raw_rules.iter().enumerate() {
            let Some(parsed) = parse_rule(raw, &self.normalizer)? else {
                continue;
            };
            let rule =
                self.assigner
                    .from_import(index, parsed.rule, parsed.id, parsed.source_template);
            selection.push_rule(rule);
        }

        let duplicates = duplicate_ids(selection.rules());
        if !duplicates.is_empty() {
            tracing::warn!(ids = ?duplicates, "imported rules share ids; id lookups keep the last one");
        }

        tracing::info!(
            policy = selection.policy_name(),
            tools = selection.tools().len(),
            rules = selection.rules().len(),
            "imported policy"
        );
        Ok(selection)
    }
}
