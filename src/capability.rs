use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ToolError;

/// Parameter that is always validated as a locator, whatever the capability declares.
pub const URL_PARAM: &str = "url";

/// Captured output of one capability invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit status of the wrapped program; `-1` when it was killed by a signal.
    pub exit_status: i32,
}

impl RunResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Normalized parameters handed to a capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    params: BTreeMap<String, String>,
}

impl RunInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<BTreeMap<String, String>> for RunInput {
    fn from(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RunInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// One pluggable scanning capability.
///
/// Implementations are created once during discovery and never mutated
/// afterwards; `run` must not keep process state between calls.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry key
    fn name(&self) -> &str;

    /// Short human readable summary for listings
    fn description(&self) -> &str {
        ""
    }

    /// External executables this capability needs on the search path
    fn dependencies(&self) -> &[String];

    /// Extra parameters, beyond `url`, that carry network locators and must be
    /// validated before `run` sees them
    fn is_locator(&self, _param: &str) -> bool {
        false
    }

    /// Perform one invocation and capture its output
    async fn run(&self, input: &RunInput) -> Result<RunResult, ToolError>;
}
