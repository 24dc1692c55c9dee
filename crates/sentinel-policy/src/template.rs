// template.rs - Rule template loading.
//
// Template file shape:
//
// ```yaml
// rule_templates:
//   - name: "Data Exfiltration"
//     description: "..."
//     static_rules: { read_file: ALLOW, shell: DENY }   # file order is kept
//     taint_rules:
//       - { action: ADD_TAINT, tool_class: SENSITIVE_READ, tag: pii }
//       - action: BLOCK_CURRENT
//         pattern: { type: sequence, steps: [{class: SENSITIVE_READ}, {class: CONSEQUENTIAL_WRITE}] }
// ```
//
// Each rule gets id "<template name>-<position in taint_rules>". Positions are
// taken before any malformed rule is dropped, so one bad entry never shifts
// the ids of the rules after it.

use std::path::Path;

use serde_json::Value;

use crate::error::PolicyError;
use crate::identity::IdentityAssigner;
use crate::pattern::{ParseMode, PatternNormalizer};
use crate::rule::RuleTemplate;
use crate::taint::StaticAction;
use crate::wire::{first_present, first_str, parse_rule};

pub fn parse_templates(text: &str, mode: ParseMode) -> Result<Vec<RuleTemplate>, PolicyError> {
    let document: Value = serde_yaml::from_str(text)?;
    let normalizer = PatternNormalizer::new(mode);

    let Some(raw_templates) = first_present(&document, &["rule_templates"]) else {
        normalizer.tolerate(PolicyError::Parse {
            format: "rule templates",
            reason: "missing `rule_templates`".to_string(),
        })?;
        return Ok(Vec::new());
    };
    let Some(raw_templates) = raw_templates.as_array() else {
        return Err(PolicyError::Parse {
            format: "rule templates",
            reason: "`rule_templates` is not a list".to_string(),
        });
    };

    let mut templates = Vec::with_capacity(raw_templates.len());
    for raw in raw_templates {
        if let Some(template) = parse_template(raw, &normalizer)? {
            templates.push(template);
        }
    }
    Ok(templates)
}

fn parse_template(
    raw: &Value,
    normalizer: &PatternNormalizer,
) -> Result<Option<RuleTemplate>, PolicyError> {
    let Some(name) = first_str(raw, &["name"]) else {
        normalizer.tolerate(PolicyError::Parse {
            format: "rule template",
            reason: "template has no name".to_string(),
        })?;
        return Ok(None);
    };

    let static_rules = parse_static_rules(
        first_present(raw, &["static_rules", "staticRules"]),
        normalizer,
    )?;

    let mut taint_rules = Vec::new();
    let raw_rules = first_present(raw, &["taint_rules", "taintRules"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (index, raw_rule) in raw_rules.iter().enumerate() {
        if let Some(parsed) = parse_rule(raw_rule, normalizer)? {
            taint_rules.push(IdentityAssigner::from_template(name, index, parsed.rule));
        } else {
            tracing::warn!(template = name, index, "dropped template rule");
        }
    }

    Ok(Some(RuleTemplate {
        name: name.to_string(),
        description: first_str(raw, &["description"])
            .unwrap_or_default()
            .to_string(),
        static_rules,
        taint_rules,
    }))
}

/// Read a `tool -> ALLOW|DENY` mapping in file order, shared by templates
/// and imports.
pub(crate) fn parse_static_rules(
    raw: Option<&Value>,
    normalizer: &PatternNormalizer,
) -> Result<Vec<(String, StaticAction)>, PolicyError> {
    let mut rules = Vec::new();
    let Some(raw) = raw else {
        return Ok(rules);
    };
    let Some(entries) = raw.as_object() else {
        normalizer.tolerate(PolicyError::Parse {
            format: "static rules",
            reason: "expected a mapping of tool to ALLOW/DENY".to_string(),
        })?;
        return Ok(rules);
    };
    for (tool, value) in entries {
        let parsed = StaticAction::parse_for(tool, value.as_str().unwrap_or_default());
        match parsed {
            Ok(action) => rules.push((tool.clone(), action)),
            Err(err) => normalizer.tolerate(err)?,
        }
    }
    Ok(rules)
}

/// Load templates from `path`. Any failure yields an empty corpus.
pub fn load_templates(path: &Path, mode: ParseMode) -> Vec<RuleTemplate> {
    let result = std::fs::read_to_string(path)
        .map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|text| parse_templates(&text, mode));
    match result {
        Ok(templates) => {
            tracing::info!(
                path = %path.display(),
                templates = templates.len(),
                "loaded rule templates"
            );
            templates
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to load rule templates");
            Vec::new()
        }
    }
}
