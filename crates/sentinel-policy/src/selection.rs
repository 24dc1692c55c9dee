// selection.rs - The operator's working selection.
//
// A `Selection` is an explicit value owned by the caller: the compiler and the
// relevance filter only ever read a snapshot of it. It starts empty, is
// mutated by add/remove/toggle, and is cleared on template switch or reset.

use serde::{Deserialize, Serialize};

use crate::catalog::{ToolCatalog, ToolDescriptor};
use crate::error::PolicyError;
use crate::identity::IdentityAssigner;
use crate::relevance::RelevanceEngine;
use crate::rule::{Rule, RuleTemplate, TemplateRule};
use crate::taint::{StaticAction, TaintClass};

/// Source template recorded on rules written by hand in the builder.
pub const AUTHORED_SOURCE: &str = "custom";

/// A tool in the working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTool {
    pub tool: ToolDescriptor,
    /// Per-tool override. Only consulted when the compiler is configured to
    /// honor overrides; otherwise membership alone means ALLOW.
    #[serde(default)]
    pub static_action: StaticAction,
}

impl SelectedTool {
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn taint_class(&self) -> TaintClass {
        self.tool.taint_class
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    policy_name: String,
    tools: Vec<SelectedTool>,
    rules: Vec<TemplateRule>,
    active_template: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    pub fn set_policy_name(&mut self, name: impl Into<String>) {
        self.policy_name = name.into();
    }

    pub fn tools(&self) -> &[SelectedTool] {
        &self.tools
    }

    pub fn rules(&self) -> &[TemplateRule] {
        &self.rules
    }

    pub fn active_template(&self) -> Option<&str> {
        self.active_template.as_deref()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn has_rule(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.id == id)
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(SelectedTool::name)
    }

    /// Primary classes of the selected tools (after any reclassification).
    pub fn tool_classes(&self) -> impl Iterator<Item = TaintClass> + '_ {
        self.tools.iter().map(SelectedTool::taint_class)
    }

    /// Relevance filter seeded from the current tool set.
    pub fn relevance(&self) -> RelevanceEngine {
        RelevanceEngine::new(self.tool_names(), self.tool_classes())
    }

    /// Add a tool. Returns false if a tool with that name is already selected.
    pub fn add_tool(&mut self, tool: ToolDescriptor) -> bool {
        if self.has_tool(&tool.name) {
            return false;
        }
        self.tools.push(SelectedTool {
            tool,
            static_action: StaticAction::Allow,
        });
        true
    }

    pub fn remove_tool(&mut self, name: &str) -> bool {
        let before = self.tools.len();
        self.tools.retain(|t| t.name() != name);
        self.tools.len() != before
    }

    /// Add the tool if absent, remove it if present. Returns true if the tool
    /// is selected afterwards.
    pub fn toggle_tool(&mut self, tool: ToolDescriptor) -> bool {
        if self.remove_tool(&tool.name) {
            false
        } else {
            self.add_tool(tool)
        }
    }

    /// Move the tool named `from` to the position currently held by `to`.
    pub fn reorder_tool(&mut self, from: &str, to: &str) -> bool {
        let old_index = self.tools.iter().position(|t| t.name() == from);
        let new_index = self.tools.iter().position(|t| t.name() == to);
        match (old_index, new_index) {
            (Some(old_index), Some(new_index)) => {
                let tool = self.tools.remove(old_index);
                self.tools.insert(new_index, tool);
                true
            }
            _ => false,
        }
    }

    pub fn set_static_action(&mut self, name: &str, action: StaticAction) -> bool {
        match self.tools.iter_mut().find(|t| t.name() == name) {
            Some(tool) => {
                tool.static_action = action;
                true
            }
            None => false,
        }
    }

    /// Override a selected tool's primary class for this selection only.
    pub fn reclassify_tool(&mut self, name: &str, class: TaintClass) -> bool {
        match self.tools.iter_mut().find(|t| t.name() == name) {
            Some(selected) => {
                selected.tool.taint_class = class;
                true
            }
            None => false,
        }
    }

    pub fn clear_tools(&mut self) {
        self.tools.clear();
    }

    /// Add a rule unless one with the same id is already selected.
    pub fn add_rule(&mut self, rule: TemplateRule) -> bool {
        if self.has_rule(&rule.id) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove_rule(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    /// Set membership by id. Returns true if the rule is selected afterwards.
    pub fn toggle_rule(&mut self, rule: TemplateRule) -> bool {
        if self.remove_rule(&rule.id) {
            false
        } else {
            self.add_rule(rule)
        }
    }

    /// Append a rule without the id check. Used when rehydrating a policy
    /// file, where every rule must survive even if ids collide.
    pub(crate) fn push_rule(&mut self, rule: TemplateRule) {
        self.rules.push(rule);
    }

    /// Validate and add a hand-written rule, giving it an id no selected
    /// rule already carries.
    pub fn author_rule(
        &mut self,
        rule: Rule,
        assigner: &IdentityAssigner,
    ) -> Result<&TemplateRule, PolicyError> {
        rule.validate_target()?;
        // Fingerprint ids depend on (index, content): after a removal the
        // current length can reproduce an id that is still selected.
        let mut index = self.rules.len();
        let id = loop {
            let id = assigner.imported_id(index, &rule);
            if !self.has_rule(&id) {
                break id;
            }
            index += 1;
        };
        let rule = assigner.from_import(index, rule, Some(id), Some(AUTHORED_SOURCE.to_string()));
        self.rules.push(rule);
        Ok(&self.rules[self.rules.len() - 1])
    }

    /// Switch to `template`: the working set is cleared, the template's rules
    /// become the selected rules, and its ALLOW tools found in `catalog` are
    /// added.
    pub fn select_template(&mut self, template: &RuleTemplate, catalog: &ToolCatalog) {
        self.tools.clear();
        for name in template.allowed_tools() {
            match catalog.get(name) {
                Some(tool) => {
                    self.add_tool(tool.clone());
                }
                None => {
                    tracing::warn!(template = %template.name, tool = name, "template tool not in catalog");
                }
            }
        }
        self.rules = template.taint_rules.clone();
        self.active_template = Some(template.name.clone());
    }

    /// Drop the template's rules but keep the tools the operator picked.
    pub fn clear_template(&mut self) {
        self.active_template = None;
        self.rules.clear();
    }

    /// Back to an empty selection. The policy name is kept.
    pub fn reset(&mut self) {
        self.tools.clear();
        self.rules.clear();
        self.active_template = None;
    }

    /// Whether there is anything worth compiling.
    pub fn can_export(&self) -> bool {
        self.active_template.is_some() || !self.tools.is_empty() || !self.rules.is_empty()
    }
}
