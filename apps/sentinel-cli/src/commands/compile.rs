// compile.rs - Build a selection from the command line, then show relevant
// rules or compile it into a policy file.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use sentinel_policy::identity::index_by_id;
use sentinel_policy::{
    flatten_corpus, load_templates, BuilderConfig, ExportBundle, PolicyCompiler, PolicyImporter,
    Selection, StaticAction, TemplateRule, ToolCatalog,
};

use super::templates::summarize;

#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Start from a previously compiled policy file.
    #[arg(long)]
    from: Option<PathBuf>,

    /// Adopt a rule template: its rules and its ALLOW tools.
    #[arg(long)]
    template: Option<String>,

    /// Tool name or glob (e.g. `read_*`) to add. Repeatable.
    #[arg(long = "tool")]
    tools: Vec<String>,

    /// Selected tool to mark DENY. Repeatable.
    #[arg(long = "deny")]
    deny: Vec<String>,

    /// Rule id to toggle in or out of the selection. Repeatable.
    #[arg(long = "rule")]
    rules: Vec<String>,

    /// Policy name (blank falls back to the config, then `default_policy`).
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    format: Format,

    /// Wrap the policy file with tool summaries and a timestamp.
    #[arg(long)]
    bundle: bool,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

/// Everything loaded for one command: presets plus the assembled selection.
struct Workspace {
    corpus: Vec<TemplateRule>,
    selection: Selection,
}

fn build_selection(config: &BuilderConfig, args: &SelectionArgs) -> anyhow::Result<Workspace> {
    let catalog = ToolCatalog::load(&config.catalog);
    let templates = load_templates(&config.templates, config.parse_mode());
    let corpus = flatten_corpus(&templates);

    let mut selection = match &args.from {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read policy file {}", path.display()))?;
            PolicyImporter::new(&catalog, config.assigner(), config.parse_mode())
                .import_str(&text)
                .with_context(|| format!("failed to import {}", path.display()))?
        }
        None => Selection::new(),
    };

    if let Some(name) = &args.template {
        let Some(template) = templates.iter().find(|t| &t.name == name) else {
            bail!(
                "unknown template '{}' (run `sentinel templates` to list them)",
                name
            );
        };
        selection.select_template(template, &catalog);
    }

    for pattern in &args.tools {
        let matched = catalog.matching(pattern)?;
        if matched.is_empty() {
            bail!("no tool in {} matches '{}'", config.catalog.display(), pattern);
        }
        for tool in matched {
            selection.add_tool(tool.clone());
        }
    }

    for name in &args.deny {
        if !selection.set_static_action(name, StaticAction::Deny) {
            bail!("cannot deny '{}': it is not selected", name);
        }
    }

    let index = index_by_id(&corpus);
    for id in &args.rules {
        let Some(rule) = index.get(id.as_str()) else {
            bail!("unknown rule id '{}'", id);
        };
        selection.toggle_rule((*rule).clone());
    }

    match args.name.as_deref() {
        Some(name) => selection.set_policy_name(name),
        None if selection.policy_name().trim().is_empty() => {
            selection.set_policy_name(config.policy_name.as_str())
        }
        None => {}
    }

    Ok(Workspace { corpus, selection })
}

pub fn relevant(config: &BuilderConfig, args: &SelectionArgs) -> anyhow::Result<()> {
    let workspace = build_selection(config, args)?;
    let suggested = PolicyCompiler::suggest(&workspace.selection, &workspace.corpus);

    if suggested.is_empty() {
        println!("No relevant rules for the selected tools.");
        return Ok(());
    }

    for rule in suggested {
        let marker = if workspace.selection.has_rule(&rule.id) {
            "[x]"
        } else {
            "[ ]"
        };
        println!("{} {:<28} {}", marker, rule.id, summarize(rule));
    }
    Ok(())
}

pub fn compile(
    config: &BuilderConfig,
    args: &SelectionArgs,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let workspace = build_selection(config, args)?;
    if !workspace.selection.can_export() {
        tracing::warn!("nothing selected; compiling an empty policy");
    }

    let policy_file = PolicyCompiler::compile(&workspace.selection, &config.compiler_options());
    let rendered = if output.bundle {
        let bundle = ExportBundle::new(&workspace.selection, policy_file);
        match output.format {
            Format::Yaml => bundle.to_yaml()?,
            Format::Json => bundle.to_json()?,
        }
    } else {
        match output.format {
            Format::Yaml => policy_file.to_yaml()?,
            Format::Json => policy_file.to_json()?,
        }
    };

    match &output.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote policy file");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
