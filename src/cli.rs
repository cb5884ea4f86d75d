use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::capability::RunInput;

#[derive(Parser, Debug)]
#[command(name = "bughunter")]
#[command(about = "Run security reconnaissance tools through one interface")]
pub struct Cli {
    /// Never prompt; fail when a tool's dependencies are missing
    #[arg(long, global = true, conflicts_with = "yes")]
    pub non_interactive: bool,

    /// Install missing dependencies without asking
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Directory of YAML tool manifests to load in addition to the built-in tools
    #[arg(long, global = true, value_name = "DIR")]
    pub extensions: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered tools and whether their dependencies are installed
    List,

    /// Check (and optionally install) a tool's dependencies without running it
    Check {
        /// Tool name
        tool: String,
    },

    /// Run any registered tool
    Run {
        /// Tool name
        tool: String,

        /// Target URL (http or https)
        #[arg(long)]
        url: Option<String>,

        /// Target host name or address
        #[arg(long)]
        host: Option<String>,

        /// Target domain
        #[arg(long)]
        domain: Option<String>,

        /// Extra tool parameter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Brute-force web paths with dirsearch
    Dirsearch {
        /// Target URL
        url: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Scan a web server with nikto
    Nikto {
        /// Target URL
        url: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Scan ports and services with nmap
    Portscan {
        /// Target host name or address
        host: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Enumerate subdomains with subfinder
    Subdomains {
        /// Target domain
        domain: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the tool's raw stdout to this file (overwrites)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the captured result as JSON
    #[arg(long)]
    pub json: bool,
}

/// A resolved dispatch request.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tool: String,
    pub input: RunInput,
    pub output: OutputArgs,
}

impl Command {
    /// The dispatch this command maps to, if it runs a tool.
    pub fn invocation(&self) -> Option<Invocation> {
        let (tool, input, output) = match self {
            Command::List | Command::Check { .. } => return None,
            Command::Run { tool, url, host, domain, params, output } => {
                let mut input: RunInput = params.iter().cloned().collect();
                let named = [("url", url), ("host", host), ("domain", domain)];
                for (key, value) in named {
                    if let Some(value) = value {
                        input.insert(key, value.clone());
                    }
                }
                (tool.clone(), input, output)
            }
            Command::Dirsearch { url, output } => ("dirsearch".to_string(), RunInput::new().with("url", url.clone()), output),
            Command::Nikto { url, output } => ("nikto".to_string(), RunInput::new().with("url", url.clone()), output),
            Command::Portscan { host, output } => ("nmap".to_string(), RunInput::new().with("host", host.clone()), output),
            Command::Subdomains { domain, output } => ("subfinder".to_string(), RunInput::new().with("domain", domain.clone()), output),
        };

        Some(Invocation {
            tool,
            input,
            output: output.clone(),
        })
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_params() {
        let cli = Cli::try_parse_from([
            "bughunter", "run", "whatweb", "--url", "https://example.com", "-p", "agent=bughunter", "-o", "out.txt",
        ])
        .unwrap();

        let invocation = cli.command.invocation().unwrap();
        assert_eq!(invocation.tool, "whatweb");
        assert_eq!(invocation.input.get("url"), Some("https://example.com"));
        assert_eq!(invocation.input.get("agent"), Some("bughunter"));
        assert_eq!(invocation.output.output, Some(PathBuf::from("out.txt")));
        assert!(!invocation.output.json);
    }

    #[test]
    fn test_named_flags_override_params() {
        let cli = Cli::try_parse_from(["bughunter", "run", "nmap", "-p", "host=a", "--host", "b"]).unwrap();
        assert_eq!(cli.command.invocation().unwrap().input.get("host"), Some("b"));
    }

    #[test]
    fn test_aliases_map_to_tools() {
        let cli = Cli::try_parse_from(["bughunter", "portscan", "10.0.0.1", "--json"]).unwrap();
        let invocation = cli.command.invocation().unwrap();
        assert_eq!(invocation.tool, "nmap");
        assert_eq!(invocation.input.get("host"), Some("10.0.0.1"));
        assert!(invocation.output.json);

        let cli = Cli::try_parse_from(["bughunter", "subdomains", "example.com"]).unwrap();
        assert_eq!(cli.command.invocation().unwrap().tool, "subfinder");
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["bughunter", "list", "--non-interactive"]).unwrap();
        assert!(cli.non_interactive);
        assert!(cli.command.invocation().is_none());

        assert!(Cli::try_parse_from(["bughunter", "--yes", "--non-interactive", "list"]).is_err());
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert_eq!(parse_param("empty=").unwrap(), ("empty".to_string(), String::new()));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
