use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::capability::{Capability, RunInput, RunResult};
use crate::error::ToolError;
use crate::runner::CommandRunner;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"));

/// Capability that wraps a single external program.
///
/// Each argument is a template; `{name}` is replaced by the `name` parameter.
pub struct CommandTool {
    name: String,
    description: String,
    dependencies: Vec<String>,
    program: String,
    args: Vec<String>,
    locators: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl CommandTool {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let program = program.into();
        Self {
            name: name.into(),
            description: String::new(),
            dependencies: vec![program.clone()],
            program,
            args,
            locators: Vec::new(),
            runner,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_locators(mut self, locators: Vec<String>) -> Self {
        self.locators = locators;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute parameters into the argument templates.
    pub fn render_args(&self, input: &RunInput) -> Result<Vec<String>, ToolError> {
        self.args.iter().map(|template| self.render(template, input)).collect()
    }

    fn render(&self, template: &str, input: &RunInput) -> Result<String, ToolError> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(param)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let param = param.as_str();
            let value = input.get(param).ok_or_else(|| ToolError::MissingParameter {
                capability: self.name.clone(),
                param: param.to_string(),
            })?;
            check_value(param, value)?;

            rendered.push_str(&template[last..whole.start()]);
            rendered.push_str(value);
            last = whole.end();
        }

        rendered.push_str(&template[last..]);
        Ok(rendered)
    }
}

/// Reject values that are empty or would be read as an option by the wrapped program.
fn check_value(param: &str, value: &str) -> Result<(), ToolError> {
    let reason = if value.trim().is_empty() {
        "value is empty"
    } else if value.starts_with('-') {
        "value must not start with '-'"
    } else {
        return Ok(());
    };

    Err(ToolError::InvalidParameter {
        param: param.to_string(),
        reason: reason.to_string(),
    })
}

#[async_trait]
impl Capability for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn is_locator(&self, param: &str) -> bool {
        self.locators.iter().any(|l| l == param)
    }

    async fn run(&self, input: &RunInput) -> Result<RunResult, ToolError> {
        let args = self.render_args(input)?;
        log::debug!("[tools::{}] run: program={} args={:?}", self.name, self.program, args);

        let start = Instant::now();
        let result = self
            .runner
            .run(&self.program, &args)
            .await
            .map_err(|source| ToolError::Execution {
                program: self.program.clone(),
                source,
            })?;

        log::info!("[tools::{}] completed: duration={}ms status={}",
            self.name, start.elapsed().as_millis(), result.exit_status);
        Ok(result)
    }
}
