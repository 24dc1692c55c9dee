// config.rs - Builder configuration.
//
// BuilderConfig says where the presets live and how strictly they are read.
// `for_project()` gives the standard `presets/` layout; `load()` overlays a
// `sentinel.toml` in the project root when one exists:
//
// ```toml
// catalog = "presets/tool_registry.yaml"
// templates = "presets/rule_templates.yaml"
// policy_name = "prod"
// strict = true
// identity = "fingerprint"
// honor_static_overrides = false
// ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::CompilerOptions;
use crate::error::PolicyError;
use crate::identity::{IdentityAssigner, IdentityStrategy};
use crate::pattern::ParseMode;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "sentinel.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Tool registry (YAML).
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    /// Rule template file (YAML).
    #[serde(default = "default_templates")]
    pub templates: PathBuf,

    /// Taint class reference definitions (JSON list).
    #[serde(default = "default_classes")]
    pub classes: PathBuf,

    /// Policy name used when none is given on the command line.
    #[serde(default)]
    pub policy_name: String,

    /// Reject malformed rules instead of dropping them.
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub identity: IdentityStrategy,

    /// Emit per-tool DENY overrides into static rules.
    #[serde(default)]
    pub honor_static_overrides: bool,
}

fn default_catalog() -> PathBuf {
    PathBuf::from("presets/tool_registry.yaml")
}

fn default_templates() -> PathBuf {
    PathBuf::from("presets/rule_templates.yaml")
}

fn default_classes() -> PathBuf {
    PathBuf::from("presets/classes.yaml")
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            templates: default_templates(),
            classes: default_classes(),
            policy_name: String::new(),
            strict: false,
            identity: IdentityStrategy::default(),
            honor_static_overrides: false,
        }
    }
}

impl BuilderConfig {
    /// Default layout with preset paths resolved against `project_root`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self::default().resolved(project_root.as_ref())
    }

    /// Read `sentinel.toml` from `project_root` if present, else defaults.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let root = project_root.as_ref();
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::for_project(root));
        }
        let text = std::fs::read_to_string(&path).map_err(|source| PolicyError::Io {
            path: path.clone(),
            source,
        })?;
        let config: BuilderConfig = toml::from_str(&text).map_err(|err| PolicyError::Config {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded builder config");
        Ok(config.resolved(root))
    }

    fn resolved(mut self, root: &Path) -> Self {
        for path in [&mut self.catalog, &mut self.templates, &mut self.classes] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }

    pub fn parse_mode(&self) -> ParseMode {
        if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        }
    }

    pub fn assigner(&self) -> IdentityAssigner {
        IdentityAssigner::new(self.identity)
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            honor_static_overrides: self.honor_static_overrides,
        }
    }
}
