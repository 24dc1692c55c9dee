//! # sentinel-policy
//!
//! Rule normalization and policy compilation for Sentinel tool-use policies.
//!
//! An operator picks tools from a [`ToolCatalog`], picks or writes taint
//! rules (usually from a [`RuleTemplate`]), and compiles the resulting
//! [`Selection`] into a [`PolicyFile`] for the enforcement runtime.
//!
//! ## Key invariants
//!
//! - **Pure compile**: [`PolicyCompiler::compile`] does no I/O; the same
//!   selection always yields the same document.
//! - **Generous read, minimal write**: wire rules are accepted in camelCase
//!   or snake_case, and emitted with only populated snake_case keys, so
//!   `normalize(denormalize(p)) == p` for canonical patterns.
//! - **Ids are set membership**: every rule carries an id from the
//!   [`IdentityAssigner`]; selection toggles by id.
//! - **Fail-open loading**: catalog and template loaders log and return an
//!   empty result rather than failing the caller.

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod identity;
pub mod import;
pub mod pattern;
pub mod relevance;
pub mod rule;
pub mod selection;
pub mod taint;
pub mod template;
pub mod wire;

pub use catalog::{
    load_class_definitions, ClassDefinition, ToolCatalog, ToolDescriptor, ToolInputSchema,
};
pub use compiler::{
    CompiledPolicy, CompilerOptions, Customer, ExportBundle, PolicyCompiler, PolicyFile,
    DEFAULT_POLICY_NAME,
};
pub use config::BuilderConfig;
pub use error::PolicyError;
pub use identity::{IdentityAssigner, IdentityStrategy};
pub use import::PolicyImporter;
pub use pattern::{ParseMode, PatternNormalizer};
pub use relevance::{flatten_corpus, RelevanceEngine};
pub use rule::{
    LogicCondition, LogicPattern, Pattern, Predicate, Rule, RuleKind, RuleTemplate,
    SequencePattern, SequenceStep, TemplateRule,
};
pub use selection::{SelectedTool, Selection};
pub use taint::{StaticAction, TaintAction, TaintClass};
pub use template::{load_templates, parse_templates};
pub use wire::{parse_rule, WireRule};
