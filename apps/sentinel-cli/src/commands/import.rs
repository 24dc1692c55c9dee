// import.rs - Show what a compiled policy file restores into the builder.

use std::path::Path;

use anyhow::Context;
use sentinel_policy::{BuilderConfig, PolicyImporter, ToolCatalog};

use super::templates::summarize;

pub fn execute(config: &BuilderConfig, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read policy file {}", file.display()))?;
    let catalog = ToolCatalog::load(&config.catalog);
    let selection = PolicyImporter::new(&catalog, config.assigner(), config.parse_mode())
        .import_str(&text)
        .with_context(|| format!("failed to import {}", file.display()))?;

    println!("Policy: {}", selection.policy_name());
    println!();
    println!("{:<24} {:<22} STATIC", "TOOL", "CLASS");
    println!("{}", "-".repeat(60));
    for tool in selection.tools() {
        println!(
            "{:<24} {:<22} {}",
            tool.name(),
            tool.taint_class(),
            tool.static_action
        );
    }
    println!();
    println!("{:<40} RULE", "ID");
    println!("{}", "-".repeat(80));
    for rule in selection.rules() {
        println!("{:<40} {}", rule.id, summarize(rule));
    }
    Ok(())
}
