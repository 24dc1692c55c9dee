// relevance.rs - Which rules are worth showing for a tool selection.
//
// This is a coarse "could this rule ever matter" filter for the operator
// view, not an evaluator. A logic pattern counts as relevant when any
// predicate in either branch mentions a selected class; AND/OR semantics are
// deliberately not applied.

use std::collections::HashSet;

use crate::rule::{Pattern, Rule, RuleTemplate, TemplateRule};
use crate::taint::TaintClass;

/// Concatenate every template's rules: template order, then rule order.
pub fn flatten_corpus(templates: &[RuleTemplate]) -> Vec<TemplateRule> {
    templates
        .iter()
        .flat_map(|template| template.taint_rules.iter().cloned())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceEngine {
    tool_names: HashSet<String>,
    classes: HashSet<TaintClass>,
}

impl RelevanceEngine {
    pub fn new<N, C>(tool_names: N, classes: C) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        C: IntoIterator<Item = TaintClass>,
    {
        Self {
            tool_names: tool_names.into_iter().map(Into::into).collect(),
            classes: classes.into_iter().collect(),
        }
    }

    /// Nothing selected yet: every rule is shown so templates can be previewed.
    pub fn is_unfiltered(&self) -> bool {
        self.tool_names.is_empty() && self.classes.is_empty()
    }

    pub fn is_relevant(&self, rule: &Rule) -> bool {
        if self.is_unfiltered() {
            return true;
        }

        let matches_tool = rule
            .tool
            .as_ref()
            .is_some_and(|tool| self.tool_names.contains(tool));
        let matches_class = rule
            .tool_class
            .is_some_and(|class| self.classes.contains(&class));
        let matches_pattern = match &rule.pattern {
            Some(Pattern::Sequence(sequence)) => sequence
                .steps
                .iter()
                .any(|step| self.classes.contains(&step.class)),
            Some(Pattern::Logic(logic)) => logic
                .predicates()
                .flat_map(|predicate| predicate.classes())
                .any(|class| self.classes.contains(&class)),
            None => false,
        };

        matches_tool || matches_class || matches_pattern
    }

    /// Relevant rules in corpus order. Nothing is reordered or deduplicated.
    pub fn filter<'a>(&self, corpus: &'a [TemplateRule]) -> Vec<&'a TemplateRule> {
        corpus
            .iter()
            .filter(|rule| self.is_relevant(&rule.rule))
            .collect()
    }
}
