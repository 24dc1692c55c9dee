// policy_flow.rs - End-to-end builder flow against on-disk presets.
//
//   1. Write a tool registry, rule templates and a config to a temp project
//   2. Load them through the fail-open loaders
//   3. Select tools, watch the relevant-rule view change
//   4. Select a template, toggle rules, compile
//   5. Re-import the compiled file and compile again
//
// The scenarios in the builder's behavior notes (class-targeted relevance,
// wire round trips, sequence normalization, cross-template ids) each get a
// test here.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::tempdir;

use sentinel_policy::{
    flatten_corpus, load_templates, BuilderConfig, CompilerOptions, IdentityAssigner, ParseMode,
    PolicyCompiler, PolicyImporter, RelevanceEngine, Selection, StaticAction, TaintClass,
    ToolCatalog, ToolDescriptor, DEFAULT_POLICY_NAME,
};

const REGISTRY: &str = r#"
tools:
  read_file:
    description: "Read a file from the local disk"
    classes: [SENSITIVE_READ]
    auto_classified: false
    args:
      path: { type: string, description: "Path to read", required: true }
  web_search:
    description: "Search the public web"
    classes: [SAFE_READ]
    auto_classified: true
    args:
      query: { type: string, description: "Search query", required: true }
  send_email:
    description: "Send an email"
    classes: [CONSEQUENTIAL_WRITE]
    auto_classified: false
    args:
      to: { type: string, description: "Recipient", required: true }
      body: { type: string, description: "Body", required: true }
  run_python:
    description: "Execute Python code"
    classes: [UNSAFE_EXECUTE]
    auto_classified: false
    args:
      code: { type: string, description: "Source", required: true }
"#;

const TEMPLATES: &str = r#"
rule_templates:
  - name: "Data Exfiltration"
    description: "Keep sensitive reads from leaving the agent"
    static_rules:
      read_file: ALLOW
      send_email: ALLOW
    taint_rules:
      - action: ADD_TAINT
        tool_class: SENSITIVE_READ
        tag: pii
      - action: CHECK_TAINT
        tool_class: CONSEQUENTIAL_WRITE
        forbidden_tags: [pii]
        error: "Sensitive data cannot be sent"
  - name: "Web Safety"
    description: "Treat web content as untrusted"
    static_rules:
      web_search: ALLOW
    taint_rules:
      - action: ADD_TAINT
        tool_class: SENSITIVE_READ
        tag: pii
      - action: BLOCK_CURRENT
        pattern:
          type: logic
          condition:
            AND:
              - session_has_class: SAFE_READ
              - current_tool_class: UNSAFE_EXECUTE
        error: "No code execution after browsing"
      - action: BLOCK_CURRENT
        pattern:
          type: sequence
          steps: [{Class: UNSAFE_EXECUTE}]
          max_distance: 3
"#;

fn write_project(root: &Path) {
    let presets = root.join("presets");
    fs::create_dir_all(&presets).unwrap();
    fs::write(presets.join("tool_registry.yaml"), REGISTRY).unwrap();
    fs::write(presets.join("rule_templates.yaml"), TEMPLATES).unwrap();
}

fn tool(catalog: &ToolCatalog, name: &str) -> ToolDescriptor {
    catalog.get(name).unwrap().clone()
}

#[test]
fn class_targeted_rule_appears_once_a_matching_tool_is_selected() {
    let project = tempdir().unwrap();
    write_project(project.path());
    let config = BuilderConfig::load(project.path()).unwrap();
    let catalog = ToolCatalog::load(&config.catalog);

    let check_rule = sentinel_policy::Rule::for_class(
        sentinel_policy::TaintAction::CheckTaint,
        TaintClass::ConsequentialWrite,
    )
    .with_forbidden_tags(["pii"]);
    let corpus = vec![IdentityAssigner::from_template("Manual", 0, check_rule)];

    let mut selection = Selection::new();
    selection.add_tool(tool(&catalog, "read_file"));
    assert!(PolicyCompiler::suggest(&selection, &corpus).is_empty());

    selection.add_tool(tool(&catalog, "send_email"));
    let suggested = PolicyCompiler::suggest(&selection, &corpus);
    assert_eq!(suggested.len(), 1);
    assert_eq!(suggested[0].id, "Manual-0");
}

#[test]
fn imported_simple_rule_compiles_back_to_the_same_wire_entry() {
    let catalog = ToolCatalog::default();
    let importer = PolicyImporter::new(&catalog, IdentityAssigner::default(), ParseMode::Lenient);
    let original = json!({"tool_class": "SAFE_READ", "action": "ADD_TAINT", "tag": "x"});
    let document = json!({"policies": [{"name": "p", "static_rules": {}, "taint_rules": [original.clone()]}]});

    let selection = importer.import_value(&document).unwrap();
    let rule = &selection.rules()[0];
    assert_eq!(
        serde_json::to_value(&rule.rule).unwrap(),
        json!({"toolClass": "SAFE_READ", "action": "ADD_TAINT", "tag": "x"})
    );

    let file = PolicyCompiler::compile(&selection, &CompilerOptions::default());
    assert_eq!(
        serde_json::to_value(&file.policies[0].taint_rules[0]).unwrap(),
        original
    );
}

#[test]
fn template_sequence_pattern_is_normalized_to_canonical_form() {
    let project = tempdir().unwrap();
    write_project(project.path());
    let config = BuilderConfig::for_project(project.path());
    let templates = load_templates(&config.templates, config.parse_mode());

    let rule = &templates[1].taint_rules[2];
    assert_eq!(
        serde_json::to_value(rule.pattern.as_ref().unwrap()).unwrap(),
        json!({"type": "sequence", "steps": [{"class": "UNSAFE_EXECUTE"}], "maxDistance": 3})
    );
}

#[test]
fn same_rule_in_two_templates_compiles_without_collision() {
    let project = tempdir().unwrap();
    write_project(project.path());
    let config = BuilderConfig::for_project(project.path());
    let templates = load_templates(&config.templates, ParseMode::Lenient);
    let corpus = flatten_corpus(&templates);

    let mut selection = Selection::new();
    selection.toggle_rule(corpus[0].clone());
    selection.toggle_rule(corpus[2].clone());
    assert_eq!(selection.rules().len(), 2);
    assert_eq!(selection.rules()[0].rule, selection.rules()[1].rule);
    assert_eq!(selection.rules()[0].id, "Data Exfiltration-0");
    assert_eq!(selection.rules()[1].id, "Web Safety-0");

    let file = PolicyCompiler::compile(&selection, &CompilerOptions::default());
    assert_eq!(file.policies[0].taint_rules.len(), 2);
}

#[test]
fn full_builder_flow_round_trips_through_import() {
    let project = tempdir().unwrap();
    write_project(project.path());
    let config = BuilderConfig::load(project.path()).unwrap();
    let catalog = ToolCatalog::load(&config.catalog);
    let templates = load_templates(&config.templates, config.parse_mode());
    let corpus = flatten_corpus(&templates);
    assert_eq!(catalog.len(), 4);
    assert_eq!(corpus.len(), 5);

    // Nothing selected: every rule is previewed.
    let mut selection = Selection::new();
    assert_eq!(PolicyCompiler::suggest(&selection, &corpus).len(), corpus.len());

    // Template switch adopts its rules and ALLOW tools.
    selection.select_template(&templates[0], &catalog);
    assert_eq!(
        selection.tool_names().collect::<Vec<_>>(),
        vec!["read_file", "send_email"]
    );
    assert_eq!(selection.rules().len(), 2);

    // Adding run_python surfaces the execution rules from the other template.
    selection.add_tool(tool(&catalog, "run_python"));
    let suggested: Vec<String> = PolicyCompiler::suggest(&selection, &corpus)
        .into_iter()
        .map(|rule| rule.id.clone())
        .collect();
    assert!(suggested.contains(&"Web Safety-1".to_string()));
    assert!(suggested.contains(&"Web Safety-2".to_string()));
    let extra = corpus.iter().find(|r| r.id == "Web Safety-2").unwrap();
    selection.toggle_rule(extra.clone());

    selection.set_policy_name("   ");
    let options = config.compiler_options();
    let compiled = PolicyCompiler::compile(&selection, &options);
    let policy = &compiled.policies[0];
    assert_eq!(policy.name, DEFAULT_POLICY_NAME);
    assert_eq!(policy.static_rules.len(), 3);
    assert!(policy
        .static_rules
        .values()
        .all(|action| *action == StaticAction::Allow));
    assert_eq!(policy.taint_rules.len(), 3);

    // Write it out, read it back, compile again: identical document.
    let out = project.path().join("policies.yaml");
    fs::write(&out, compiled.to_yaml().unwrap()).unwrap();
    let importer = PolicyImporter::new(&catalog, config.assigner(), config.parse_mode());
    let reimported = importer
        .import_str(&fs::read_to_string(&out).unwrap())
        .unwrap();
    let recompiled = PolicyCompiler::compile(&reimported, &options);
    assert_eq!(recompiled, compiled);
}

#[test]
fn relevance_respects_class_subsets_across_the_loaded_corpus() {
    let project = tempdir().unwrap();
    write_project(project.path());
    let templates = load_templates(
        &project.path().join("presets/rule_templates.yaml"),
        ParseMode::Lenient,
    );
    let corpus = flatten_corpus(&templates);

    let small = RelevanceEngine::new(["web_search"], [TaintClass::SafeRead]);
    let large = RelevanceEngine::new(
        ["web_search", "run_python"],
        [TaintClass::SafeRead, TaintClass::UnsafeExecute],
    );
    let small_ids: Vec<&str> = small.filter(&corpus).into_iter().map(|r| r.id.as_str()).collect();
    let large_ids: Vec<&str> = large.filter(&corpus).into_iter().map(|r| r.id.as_str()).collect();
    assert_eq!(small_ids, vec!["Web Safety-1"]);
    assert!(small_ids.iter().all(|id| large_ids.contains(id)));
    assert_eq!(large_ids, vec!["Web Safety-1", "Web Safety-2"]);
}

#[test]
fn missing_presets_leave_the_builder_usable() {
    let project = tempdir().unwrap();
    let config = BuilderConfig::load(project.path()).unwrap();
    let catalog = ToolCatalog::load(&config.catalog);
    let templates = load_templates(&config.templates, config.parse_mode());
    assert!(catalog.is_empty());
    assert!(templates.is_empty());

    let file = PolicyCompiler::compile(&Selection::new(), &config.compiler_options());
    assert_eq!(file.policies[0].name, DEFAULT_POLICY_NAME);
}
