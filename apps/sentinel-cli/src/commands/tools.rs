// tools.rs - Catalog browsing: tools, classes.

use sentinel_policy::{load_class_definitions, BuilderConfig, ToolCatalog};

pub fn list(config: &BuilderConfig, search: Option<&str>) -> anyhow::Result<()> {
    let catalog = ToolCatalog::load(&config.catalog);
    let tools = catalog.search(search.unwrap_or_default());

    if tools.is_empty() {
        println!("No tools found in {}", config.catalog.display());
        return Ok(());
    }

    println!("{:<24} {:<22} DESCRIPTION", "TOOL", "CLASS");
    println!("{}", "-".repeat(80));
    for tool in tools {
        let marker = if tool.is_common { "*" } else { " " };
        println!(
            "{}{:<23} {:<22} {}",
            marker, tool.name, tool.taint_class, tool.description
        );
    }
    Ok(())
}

pub fn classes(config: &BuilderConfig) -> anyhow::Result<()> {
    let definitions = load_class_definitions(&config.classes);
    if definitions.is_empty() {
        println!("No class definitions found in {}", config.classes.display());
        return Ok(());
    }

    for definition in definitions {
        println!("{}", definition.class_name);
        println!("  {}", definition.description);
        if !definition.classification_rule.is_empty() {
            println!("  rule:      {}", definition.classification_rule);
        }
        if !definition.example_function_name.is_empty() {
            println!(
                "  example:   {} ({})",
                definition.example_function_name, definition.example_function_description
            );
        }
        if !definition.necessity.is_empty() {
            println!("  necessity: {}", definition.necessity);
        }
        println!();
    }
    Ok(())
}
