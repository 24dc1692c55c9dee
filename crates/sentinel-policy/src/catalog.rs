// catalog.rs - Tool registry and taint class definitions.
//
// The registry is an ordered YAML mapping:
//
// ```yaml
// tools:
//   read_file:
//     description: "Read a file from disk"
//     classes: [SENSITIVE_READ]
//     auto_classified: false
//     args:
//       path: { type: string, description: "File path", required: true }
// ```
//
// Only `classes[0]` (the primary class), the description and the args are
// used. Catalog order is preserved. Loading is fail-open: a missing or
// unreadable registry produces an empty catalog and an error log.

use std::collections::BTreeMap;
use std::path::Path;

use glob::Pattern as GlobPattern;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::taint::TaintClass;

/// Tools highlighted as common picks in the builder.
const COMMON_TOOLS: &[&str] = &["web_search", "read_file", "send_email", "read_database"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInputProperty {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// JSON-schema-like description of a tool's arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, ToolInputProperty>,
    /// Required argument names, in declaration order.
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub display_name: String,
    /// Primary class: the first entry of `classes` in the registry.
    pub taint_class: TaintClass,
    pub classes: Vec<TaintClass>,
    pub description: String,
    pub input_schema: ToolInputSchema,
    pub is_common: bool,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, taint_class: TaintClass) -> Self {
        let name = name.into();
        Self {
            display_name: display_name(&name),
            is_common: COMMON_TOOLS.contains(&name.as_str()),
            name,
            taint_class,
            classes: vec![taint_class],
            description: String::new(),
            input_schema: ToolInputSchema::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// "read_file" -> "Read File".
pub fn display_name(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct RawArg {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct RawTool {
    #[serde(default)]
    description: String,
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    args: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    tools: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// Parse a registry document. Tools whose classes are all unknown are
    /// skipped with a warning; a document of the wrong shape is an error.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let raw: RawCatalog = serde_yaml::from_str(text)?;
        let mut tools = Vec::with_capacity(raw.tools.len());

        for (key, value) in raw.tools {
            let Some(name) = key.as_str().map(str::to_string) else {
                tracing::warn!(key = ?key, "skipping tool with a non-string name");
                continue;
            };
            let raw_tool: RawTool = serde_yaml::from_value(value)?;
            match build_descriptor(name, raw_tool)? {
                Some(tool) => tools.push(tool),
                None => continue,
            }
        }

        Ok(Self { tools })
    }

    /// Load the registry at `path`, degrading to an empty catalog on failure.
    pub fn load(path: &Path) -> Self {
        let result = std::fs::read_to_string(path)
            .map_err(|source| PolicyError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| Self::parse(&text));
        match result {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), tools = catalog.len(), "loaded tool catalog");
                catalog
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load tool catalog");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Case-insensitive search over name, display name, description and
    /// primary class. A blank query returns every tool.
    pub fn search(&self, query: &str) -> Vec<&ToolDescriptor> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.tools.iter().collect();
        }
        self.tools
            .iter()
            .filter(|tool| {
                tool.name.to_lowercase().contains(&query)
                    || tool.display_name.to_lowercase().contains(&query)
                    || tool.description.to_lowercase().contains(&query)
                    || tool.taint_class.as_str().to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Tools whose name matches a glob such as `read_*`, in catalog order.
    pub fn matching(&self, pattern: &str) -> Result<Vec<&ToolDescriptor>, PolicyError> {
        let glob = GlobPattern::new(pattern).map_err(|err| PolicyError::Parse {
            format: "tool pattern",
            reason: format!("'{}': {}", pattern, err),
        })?;
        Ok(self
            .tools
            .iter()
            .filter(|tool| glob.matches(&tool.name))
            .collect())
    }
}

fn build_descriptor(name: String, raw: RawTool) -> Result<Option<ToolDescriptor>, PolicyError> {
    let classes: Vec<TaintClass> = raw
        .classes
        .iter()
        .filter_map(|class| match class.parse::<TaintClass>() {
            Ok(class) => Some(class),
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "ignoring unknown class");
                None
            }
        })
        .collect();

    let Some(&taint_class) = classes.first() else {
        tracing::warn!(tool = %name, "skipping tool without a known taint class");
        return Ok(None);
    };

    let mut schema = ToolInputSchema::default();
    for (key, value) in raw.args {
        let Some(arg_name) = key.as_str().map(str::to_string) else {
            continue;
        };
        let arg: RawArg = serde_yaml::from_value(value)?;
        if arg.required {
            schema.required.push(arg_name.clone());
        }
        schema.properties.insert(
            arg_name,
            ToolInputProperty {
                kind: arg.kind,
                description: arg.description,
            },
        );
    }

    Ok(Some(ToolDescriptor {
        display_name: display_name(&name),
        is_common: COMMON_TOOLS.contains(&name.as_str()),
        name,
        taint_class,
        classes,
        description: raw.description,
        input_schema: schema,
    }))
}

/// Reference documentation for one taint class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub class_name: TaintClass,
    #[serde(default)]
    pub classification_rule: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example_function_name: String,
    #[serde(default)]
    pub example_function_description: String,
    #[serde(default)]
    pub necessity: String,
}

/// Parse class definitions. The file is a JSON list (YAML-compatible).
pub fn parse_class_definitions(text: &str) -> Result<Vec<ClassDefinition>, PolicyError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Load class definitions, degrading to an empty list on failure.
pub fn load_class_definitions(path: &Path) -> Vec<ClassDefinition> {
    let result = std::fs::read_to_string(path)
        .map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|text| parse_class_definitions(&text));
    result.unwrap_or_else(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to load class definitions");
        Vec::new()
    })
}
