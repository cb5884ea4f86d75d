use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::capability::Capability;
use crate::error::ToolError;

type Loader = Box<dyn FnOnce() -> eyre::Result<Vec<Arc<dyn Capability>>> + Send>;

/// One unit of discovery: a built-in entry or a manifest file.
///
/// The loader runs during discovery, so a broken extension only costs its own
/// capabilities.
pub struct Extension {
    origin: String,
    loader: Loader,
}

impl Extension {
    pub fn new<F>(origin: impl Into<String>, loader: F) -> Self
    where
        F: FnOnce() -> eyre::Result<Vec<Arc<dyn Capability>>> + Send + 'static,
    {
        Self {
            origin: origin.into(),
            loader: Box::new(loader),
        }
    }

    /// Extension that declares already constructed capabilities.
    pub fn from_capabilities(origin: impl Into<String>, capabilities: Vec<Arc<dyn Capability>>) -> Self {
        Self::new(origin, move || Ok(capabilities))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension").field("origin", &self.origin).finish_non_exhaustive()
    }
}

/// Non-fatal problem found while loading one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDiagnostic {
    pub origin: String,
    pub message: String,
}

impl std::fmt::Display for DiscoveryDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.origin, self.message)
    }
}

/// Result of a discovery pass.
#[derive(Debug)]
pub struct Discovery {
    pub registry: Registry,
    pub diagnostics: Vec<DiscoveryDiagnostic>,
}

/// Key to capability mapping.
///
/// Filled once by [`Registry::discover`] (or `register` in tests), then shared
/// read-only behind an `Arc`.
#[derive(Default)]
pub struct Registry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a capability under its own name. The first registration of a key wins.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), ToolError> {
        let key = capability.name().to_string();
        if self.capabilities.contains_key(&key) {
            log::warn!("[registry] duplicate_rejected: key={}", key);
            return Err(ToolError::DuplicateCapability(key));
        }

        log::debug!("[registry] registered: key={} dependencies={:?}", key, capability.dependencies());
        self.capabilities.insert(key, capability);
        Ok(())
    }

    /// Exact-match lookup.
    pub fn lookup(&self, key: &str) -> Result<Arc<dyn Capability>, ToolError> {
        self.capabilities
            .get(key)
            .cloned()
            .ok_or_else(|| ToolError::UnknownCapability(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.capabilities.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.capabilities.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Capabilities sorted by key.
    pub fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        let mut caps: Vec<Arc<dyn Capability>> = self.capabilities.values().cloned().collect();
        caps.sort_by(|a, b| a.name().cmp(b.name()));
        caps
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Build a registry from every extension, isolating failures per extension.
    pub fn discover(extensions: impl IntoIterator<Item = Extension>) -> Discovery {
        let mut registry = Registry::new();
        let mut diagnostics = Vec::new();

        for extension in extensions {
            let Extension { origin, loader } = extension;
            log::debug!("[registry] loading_extension: origin={}", origin);

            let capabilities = match catch_unwind(AssertUnwindSafe(loader)) {
                Ok(Ok(capabilities)) => capabilities,
                Ok(Err(e)) => {
                    let message = e.chain().map(|c| c.to_string()).collect::<Vec<_>>().join(": ");
                    log::warn!("[registry] extension_failed: origin={} error={}", origin, message);
                    diagnostics.push(DiscoveryDiagnostic { origin, message });
                    continue;
                }
                Err(_) => {
                    log::error!("[registry] extension_panicked: origin={}", origin);
                    diagnostics.push(DiscoveryDiagnostic {
                        origin,
                        message: "extension panicked while loading".to_string(),
                    });
                    continue;
                }
            };

            for capability in capabilities {
                if let Err(e) = registry.register(capability) {
                    diagnostics.push(DiscoveryDiagnostic {
                        origin: origin.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!("[registry] discovery_completed: capabilities={} diagnostics={}",
            registry.len(), diagnostics.len());

        Discovery { registry, diagnostics }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("keys", &self.keys()).finish()
    }
}
