// compiler.rs - Policy Compiler.
//
// Compiles a tool selection, a rule selection and a policy name into the
// policy file consumed by the enforcement runtime:
//
// ```yaml
// customers:
//   - api_key: ""
//     owner: ""
//     mcp_upstream_url: ""
//     policy_name: default_policy
// policies:
//   - name: default_policy
//     static_rules: { read_file: ALLOW }
//     taint_rules:
//       - { action: ADD_TAINT, tool_class: SENSITIVE_READ, tag: pii }
// ```
//
// Compilation is a pure function of its inputs: no I/O, no clock, no
// randomness. The same inputs always produce an identical document. The JSON
// and YAML renderings are two serializations of the same `PolicyFile` value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ToolInputSchema;
use crate::error::PolicyError;
use crate::identity::duplicate_ids;
use crate::relevance::RelevanceEngine;
use crate::rule::TemplateRule;
use crate::selection::{SelectedTool, Selection};
use crate::taint::{StaticAction, TaintClass};
use crate::wire::WireRule;

/// Name used when the requested policy name is blank.
pub const DEFAULT_POLICY_NAME: &str = "default_policy";

/// Version stamped on export bundles.
pub const EXPORT_VERSION: &str = "1.0.0";

/// Provisioning stub for the downstream gateway. Always blank except for the
/// policy it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub api_key: String,
    pub owner: String,
    pub mcp_upstream_url: String,
    pub policy_name: String,
}

impl Customer {
    pub fn placeholder(policy_name: &str) -> Self {
        Self {
            api_key: String::new(),
            owner: String::new(),
            mcp_upstream_url: String::new(),
            policy_name: policy_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPolicy {
    pub name: String,
    pub static_rules: BTreeMap<String, StaticAction>,
    pub taint_rules: Vec<WireRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFile {
    pub customers: Vec<Customer>,
    pub policies: Vec<CompiledPolicy>,
}

impl PolicyFile {
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Block-style YAML rendering of the same data.
    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Options for the Policy Compiler.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Emit each tool's own static action instead of ALLOW for every
    /// selected tool. Off by default: selection itself is the allow signal.
    pub honor_static_overrides: bool,
}

/// The Policy Compiler: turns a selection into an enforceable policy file.
pub struct PolicyCompiler;

impl PolicyCompiler {
    /// Compile a selection snapshot.
    pub fn compile(selection: &Selection, options: &CompilerOptions) -> PolicyFile {
        Self::compile_parts(
            selection.tools(),
            selection.rules(),
            selection.policy_name(),
            options,
        )
    }

    /// Compile from the three raw inputs.
    pub fn compile_parts(
        tools: &[SelectedTool],
        rules: &[TemplateRule],
        policy_name: &str,
        options: &CompilerOptions,
    ) -> PolicyFile {
        let name = Self::policy_name(policy_name);

        let duplicates = duplicate_ids(rules);
        if !duplicates.is_empty() {
            tracing::warn!(ids = ?duplicates, "selected rules share ids; id lookups keep the last one");
        }

        let static_rules = Self::static_rules(tools, options);
        let taint_rules: Vec<WireRule> = rules.iter().map(|rule| WireRule::from(&rule.rule)).collect();

        tracing::debug!(
            policy = %name,
            static_rules = static_rules.len(),
            taint_rules = taint_rules.len(),
            "compiled policy"
        );

        PolicyFile {
            customers: vec![Customer::placeholder(&name)],
            policies: vec![CompiledPolicy {
                name,
                static_rules,
                taint_rules,
            }],
        }
    }

    /// Trimmed policy name, or [`DEFAULT_POLICY_NAME`] when blank.
    pub fn policy_name(requested: &str) -> String {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            DEFAULT_POLICY_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn static_rules(
        tools: &[SelectedTool],
        options: &CompilerOptions,
    ) -> BTreeMap<String, StaticAction> {
        tools
            .iter()
            .map(|selected| {
                let action = if options.honor_static_overrides {
                    selected.static_action
                } else {
                    StaticAction::Allow
                };
                (selected.name().to_string(), action)
            })
            .collect()
    }

    /// Rules from `corpus` worth showing for the current selection.
    pub fn suggest<'a>(selection: &Selection, corpus: &'a [TemplateRule]) -> Vec<&'a TemplateRule> {
        let engine: RelevanceEngine = selection.relevance();
        engine.filter(corpus)
    }
}

/// Tool summary carried in an export bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedTool {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
    pub taint_class: TaintClass,
}

/// Archival wrapper around a compiled policy file.
///
/// The wrapped `policy_file` is byte-for-byte what [`PolicyCompiler::compile`]
/// produced; the bundle only adds the tool summaries and a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub tools: Vec<ExportedTool>,
    pub policy_file: PolicyFile,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportBundle {
    pub fn new(selection: &Selection, policy_file: PolicyFile) -> Self {
        Self {
            tools: selection
                .tools()
                .iter()
                .map(|selected| ExportedTool {
                    name: selected.tool.name.clone(),
                    description: selected.tool.description.clone(),
                    input_schema: selected.tool.input_schema.clone(),
                    taint_class: selected.tool.taint_class,
                })
                .collect(),
            policy_file,
            exported_at: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
