use eyre::{Result, WrapErr};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use bughunter::cli::{Command, Invocation};
use bughunter::resolver::{AlwaysAllow, AlwaysDeny, Consent, TerminalConsent};
use bughunter::runner::{CommandRunner, SystemRunner};
use bughunter::{DependencyResolver, Gateway, Registry, ToolError, pretty, tools};

const EXTENSIONS_DIR_NAME: &str = "tools";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = bughunter::cli::parse();

    if let Err(e) = bughunter::init_logging(cli.verbose) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    log::info!("================================================================================");
    log::info!("NEW BUGHUNTER SESSION: command={:?}", cli.command);
    log::info!("================================================================================");

    let interactive = !cli.non_interactive && std::io::stdin().is_terminal();
    let consent: Arc<dyn Consent> = if cli.yes {
        Arc::new(AlwaysAllow)
    } else if interactive {
        Arc::new(TerminalConsent)
    } else {
        Arc::new(AlwaysDeny)
    };
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    let extension_dir = cli.extensions.clone().or_else(|| {
        dirs::config_dir().map(|dir| dir.join("bughunter").join(EXTENSIONS_DIR_NAME))
    });
    let discovery = Registry::discover(tools::default_extensions(Arc::clone(&runner), extension_dir.as_deref()));
    pretty::print_diagnostics(&discovery.diagnostics);

    let resolver = DependencyResolver::system(consent);
    let gateway = Gateway::new(Arc::new(discovery.registry), resolver).with_interactive(interactive || cli.yes);

    match &cli.command {
        Command::List => {
            pretty::print_capabilities(&gateway.registry().capabilities(), gateway.resolver());
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { tool } => match gateway.check(tool).await {
            Ok(outcome) => {
                println!("{}", pretty::format_outcome(tool, &outcome));
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(report_failure(&e)),
        },
        command => {
            let invocation = command
                .invocation()
                .ok_or_else(|| eyre::eyre!("command does not run a tool"))?;
            run(&gateway, invocation).await
        }
    }
}

async fn run(gateway: &Gateway, invocation: Invocation) -> Result<ExitCode> {
    let Invocation { tool, input, output } = invocation;
    let target = ["url", "host", "domain"].iter().find_map(|key| input.get(key)).map(String::from);

    if !output.json {
        pretty::print_header(&tool, target.as_deref());
    }

    let start = Instant::now();
    let (result, failure) = match gateway.dispatch(&tool, input, output.output.as_deref()).await {
        Ok(result) => (result, None),
        Err(e) => {
            let code = report_failure(&e);
            // Output that could not be persisted is still shown.
            match e.into_result() {
                Some(result) => (result, Some(code)),
                None => return Ok(code),
            }
        }
    };

    if output.json {
        let json = serde_json::to_string_pretty(&result).wrap_err("Failed to serialize result")?;
        println!("{}", json);
    } else {
        pretty::print_run_result(&tool, &result, start.elapsed());
        if let (Some(path), None) = (&output.output, failure) {
            println!("📄 Output saved to {}", path.display());
        }
    }

    Ok(failure.unwrap_or_else(|| exit_code(result.exit_status)))
}

fn report_failure(error: &ToolError) -> ExitCode {
    log::error!("[main] dispatch_failed: error={}", error);
    eprintln!("❌ {}", error);

    if let ToolError::UnsatisfiedDependency { missing } = error {
        eprintln!("   Install {} manually, or re-run with --yes to install automatically.", missing.join(", "));
    }
    ExitCode::FAILURE
}

fn exit_code(status: i32) -> ExitCode {
    match u8::try_from(status) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
