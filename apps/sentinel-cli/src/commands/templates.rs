// templates.rs - List rule templates and the ids of their rules.

use sentinel_policy::{load_templates, BuilderConfig, Rule, RuleKind};

pub fn list(config: &BuilderConfig) -> anyhow::Result<()> {
    let templates = load_templates(&config.templates, config.parse_mode());
    if templates.is_empty() {
        println!("No rule templates found in {}", config.templates.display());
        return Ok(());
    }

    for template in &templates {
        println!("{} ({} rules)", template.name, template.taint_rules.len());
        if !template.description.is_empty() {
            println!("  {}", template.description);
        }
        for (tool, action) in &template.static_rules {
            println!("  static  {:<20} {}", tool, action);
        }
        for rule in &template.taint_rules {
            println!("  {:<28} {}", rule.id, summarize(rule));
        }
        println!();
    }
    Ok(())
}

/// One-line description of a rule for listings.
pub fn summarize(rule: &Rule) -> String {
    let target = match rule.kind() {
        RuleKind::Pattern => "pattern".to_string(),
        RuleKind::Simple => match (&rule.tool, rule.tool_class) {
            (Some(tool), _) => format!("tool={}", tool),
            (None, Some(class)) => format!("class={}", class),
            (None, None) => "no target".to_string(),
        },
    };
    let mut line = format!("{:<14} {}", rule.action, target);
    if let Some(tag) = &rule.tag {
        line.push_str(&format!(" tag={}", tag));
    }
    if !rule.forbidden_tags.is_empty() {
        line.push_str(&format!(" forbidden={}", rule.forbidden_tags.join(",")));
    }
    line
}
