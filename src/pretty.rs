use std::time::Duration;

use crate::capability::{Capability, RunResult};
use crate::registry::DiscoveryDiagnostic;
use crate::resolver::{DependencyResolver, ResolutionOutcome};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SEPARATOR_WIDTH: usize = 80;
const NAME_COLUMN_WIDTH: usize = 12;

pub fn print_separator() {
    println!("{}", "─".repeat(SEPARATOR_WIDTH));
}

pub fn print_header(tool: &str, target: Option<&str>) {
    match target {
        Some(target) => println!("🎯 {}: {}", tool.to_uppercase(), target),
        None => println!("🎯 {}", tool.to_uppercase()),
    }
    print_separator();
}

/// Print captured output followed by a one-line status footer.
pub fn print_run_result(tool: &str, result: &RunResult, elapsed: Duration) {
    print!("{}", result.stdout);
    if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
        println!();
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
    print_separator();
    println!("{}", format_run_summary(tool, result, elapsed));
}

pub fn format_run_summary(tool: &str, result: &RunResult, elapsed: Duration) -> String {
    let icon = if result.success() { "✅" } else { "❌" };
    format!(
        "{} {} exited with status {} in {} ({} bytes stdout)",
        icon,
        tool.to_uppercase(),
        result.exit_status,
        format_duration(elapsed),
        result.stdout.len()
    )
}

/// One line per capability: name, description, and dependency presence.
pub fn format_capability(capability: &dyn Capability, resolver: &DependencyResolver) -> String {
    let deps: Vec<String> = capability
        .dependencies()
        .iter()
        .map(|dep| format!("{}{}", dep, if resolver.probe(dep) { "✓" } else { "✗" }))
        .collect();
    let missing = resolver.missing(capability.dependencies());
    let icon = if missing.is_empty() { "✅" } else { "⚠️" };

    let mut line = format!("{} {:<width$}", icon, capability.name(), width = NAME_COLUMN_WIDTH);
    if !capability.description().is_empty() {
        line.push_str(&format!(" {}", capability.description()));
    }
    if !deps.is_empty() {
        line.push_str(&format!(" [{}]", deps.join(", ")));
    }
    line
}

pub fn print_capabilities(capabilities: &[std::sync::Arc<dyn Capability>], resolver: &DependencyResolver) {
    println!("🧰 {} tools registered", capabilities.len());
    print_separator();
    for capability in capabilities {
        println!("{}", format_capability(capability.as_ref(), resolver));
    }
}

pub fn print_diagnostics(diagnostics: &[DiscoveryDiagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("⚠️  Skipped extension {}", diagnostic);
    }
}

pub fn format_outcome(tool: &str, outcome: &ResolutionOutcome) -> String {
    if outcome.required.is_empty() {
        format!("✅ {} has no external dependencies", tool)
    } else if outcome.install_attempted {
        format!("✅ {} ready (installed: {})", tool, outcome.missing.join(", "))
    } else {
        format!("✅ {} ready ({})", tool, outcome.required.join(", "))
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < SECONDS_PER_MINUTE {
        format!("{}s", total_secs)
    } else if total_secs < SECONDS_PER_HOUR {
        format!("{}m{}s", total_secs / SECONDS_PER_MINUTE, total_secs % SECONDS_PER_MINUTE)
    } else {
        let hours = total_secs / SECONDS_PER_HOUR;
        let minutes = (total_secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        format!("{}h{}m", hours, minutes)
    }
}
