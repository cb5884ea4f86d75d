use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::capability::{Capability, RunInput, RunResult, URL_PARAM};
use crate::error::ToolError;
use crate::locator::validate_locator;
use crate::registry::Registry;
use crate::resolver::{DependencyResolver, ResolutionOutcome};

/// Uniform entry point for running a registered capability.
///
/// Each `dispatch` is exactly one attempt: lookup, locator validation,
/// dependency check, run, then optional persistence of stdout.
pub struct Gateway {
    registry: Arc<Registry>,
    resolver: DependencyResolver,
    interactive: bool,
}

impl Gateway {
    pub fn new(registry: Arc<Registry>, resolver: DependencyResolver) -> Self {
        Self {
            registry,
            resolver,
            interactive: true,
        }
    }

    /// When false, missing dependencies fail immediately without prompting.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Resolve a capability's dependencies without running it.
    pub async fn check(&self, key: &str) -> Result<ResolutionOutcome, ToolError> {
        let capability = self.registry.lookup(key)?;
        self.resolver.ensure(capability.dependencies(), self.interactive).await
    }

    pub async fn dispatch(
        &self,
        key: &str,
        input: RunInput,
        output_path: Option<&Path>,
    ) -> Result<RunResult, ToolError> {
        log::info!("[gateway] dispatch: key={} params={} output={:?}", key, input.len(), output_path);

        let capability = self.registry.lookup(key)?;
        validate_input(capability.as_ref(), &input)?;
        self.resolver.ensure(capability.dependencies(), self.interactive).await?;

        let start = Instant::now();
        let result = capability.run(&input).await?;
        log::info!("[gateway] run_completed: key={} duration={}ms status={} stdout_len={}",
            key, start.elapsed().as_millis(), result.exit_status, result.stdout.len());

        match output_path {
            Some(path) => persist(path, result).await,
            None => Ok(result),
        }
    }
}

/// Validate `url` and every other parameter the capability treats as a locator.
pub fn validate_input(capability: &dyn Capability, input: &RunInput) -> Result<(), ToolError> {
    let locators = input
        .iter()
        .filter(|(param, _)| *param == URL_PARAM || capability.is_locator(param));
    for (param, value) in locators {
        validate_locator(value).inspect_err(|_| {
            log::warn!("[gateway] invalid_locator: key={} param={}", capability.name(), param);
        })?;
    }
    Ok(())
}

/// Write stdout verbatim, replacing whatever was at `path`.
async fn persist(path: &Path, result: RunResult) -> Result<RunResult, ToolError> {
    match tokio::fs::write(path, result.stdout.as_bytes()).await {
        Ok(()) => {
            log::debug!("[gateway] output_written: path={} bytes={}", path.display(), result.stdout.len());
            Ok(result)
        }
        Err(source) => {
            log::error!("[gateway] output_write_failed: path={} error={}", path.display(), source);
            Err(ToolError::OutputWrite {
                path: path.to_path_buf(),
                source,
                result,
            })
        }
    }
}
