//! Declarative tool manifests.
//!
//! A manifest describes one command-wrapping capability. The built-in tools
//! are manifests compiled into the binary; operators can add more by dropping
//! YAML files into the extension directory:
//!
//! ```yaml
//! name: whatweb
//! description: Web technology fingerprinting
//! dependencies: [whatweb]
//! program: whatweb
//! args: ["--color=never", "{url}"]
//! ```
//!
//! `url` is always validated as an http(s) locator. `locators` names any
//! further parameters that need the same check.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use super::command::CommandTool;
use crate::capability::Capability;
use crate::registry::Extension;
use crate::runner::CommandRunner;

static TOOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("tool name pattern is valid"));

/// Errors raised while reading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `[program]` when omitted
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Locator parameters besides `url`
    #[serde(default)]
    pub locators: Vec<String>,
}

impl ToolManifest {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_yaml(&content).map_err(|source| ManifestError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if !TOOL_NAME.is_match(&self.name) {
            return Err(ManifestError::Validation(format!(
                "name '{}' must be lowercase letters, digits, '-' or '_'",
                self.name
            )));
        }
        if self.program.trim().is_empty() {
            return Err(ManifestError::Validation(format!("tool '{}' has no program", self.name)));
        }
        if let Some(dep) = self.dependencies.iter().flatten().find(|d| d.trim().is_empty()) {
            return Err(ManifestError::Validation(format!(
                "tool '{}' declares an empty dependency {:?}",
                self.name, dep
            )));
        }
        if let Some(deps) = &self.dependencies {
            let mut seen = HashSet::new();
            if let Some(dup) = deps.iter().find(|d| !seen.insert(d.as_str())) {
                return Err(ManifestError::Validation(format!(
                    "tool '{}' lists dependency '{}' more than once",
                    self.name, dup
                )));
            }
        }
        Ok(())
    }

    pub fn into_tool(self, runner: Arc<dyn CommandRunner>) -> CommandTool {
        let tool = CommandTool::new(self.name, self.program, self.args, runner)
            .with_description(self.description)
            .with_locators(self.locators);
        match self.dependencies {
            Some(dependencies) => tool.with_dependencies(dependencies),
            None => tool,
        }
    }
}

/// One extension per YAML file in `dir`.
///
/// A missing directory contributes nothing. An unreadable directory becomes a
/// single failing extension so discovery reports it.
pub fn load_directory(dir: &Path, runner: Arc<dyn CommandRunner>) -> Vec<Extension> {
    if !dir.exists() {
        log::debug!("[tools::manifest] extension_dir_missing: dir={}", dir.display());
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) => {
            let path = dir.to_path_buf();
            let origin = dir.display().to_string();
            return vec![Extension::new(origin, move || {
                Err(ManifestError::Io { path, source }.into())
            })];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    log::debug!("[tools::manifest] manifests_found: dir={} count={}", dir.display(), paths.len());

    paths
        .into_iter()
        .map(|path| {
            let runner = Arc::clone(&runner);
            let origin = path.display().to_string();
            Extension::new(origin, move || {
                let manifest = ToolManifest::from_file(&path)?;
                let tool: Arc<dyn Capability> = Arc::new(manifest.into_tool(runner));
                Ok(vec![tool])
            })
        })
        .collect()
}
