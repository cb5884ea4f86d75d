pub mod command;
pub mod manifest;

pub use command::CommandTool;
pub use manifest::{ManifestError, ToolManifest, load_directory};

use std::path::Path;
use std::sync::Arc;

use crate::capability::Capability;
use crate::registry::Extension;
use crate::runner::CommandRunner;

const BUILTIN_ORIGIN: &str = "builtin";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Manifests for the tools that ship with the binary.
pub fn builtin_manifests() -> Vec<ToolManifest> {
    vec![
        ToolManifest {
            name: "dirsearch".to_string(),
            description: "Web path brute-forcing".to_string(),
            dependencies: Some(strings(&["dirsearch"])),
            program: "dirsearch".to_string(),
            args: strings(&["-u", "{url}", "--format", "plain"]),
            locators: Vec::new(),
        },
        ToolManifest {
            name: "nikto".to_string(),
            description: "Web server vulnerability scanning".to_string(),
            dependencies: Some(strings(&["nikto"])),
            program: "nikto".to_string(),
            args: strings(&["-h", "{url}"]),
            locators: Vec::new(),
        },
        ToolManifest {
            name: "nmap".to_string(),
            description: "Port and service scanning".to_string(),
            dependencies: Some(strings(&["nmap"])),
            program: "nmap".to_string(),
            args: strings(&["-sV", "{host}"]),
            locators: Vec::new(),
        },
        ToolManifest {
            name: "subfinder".to_string(),
            description: "Passive subdomain enumeration".to_string(),
            dependencies: Some(strings(&["subfinder"])),
            program: "subfinder".to_string(),
            args: strings(&["-silent", "-d", "{domain}"]),
            locators: Vec::new(),
        },
    ]
}

/// Built-in tools as one extension, one extension per manifest file in
/// `extension_dir` after it.
pub fn default_extensions(runner: Arc<dyn CommandRunner>, extension_dir: Option<&Path>) -> Vec<Extension> {
    let builtin_runner = Arc::clone(&runner);
    let mut extensions = vec![Extension::new(BUILTIN_ORIGIN, move || {
        builtin_manifests()
            .into_iter()
            .map(|manifest| -> eyre::Result<Arc<dyn Capability>> {
                manifest.validate()?;
                let tool: Arc<dyn Capability> = Arc::new(manifest.into_tool(Arc::clone(&builtin_runner)));
                Ok(tool)
            })
            .collect()
    })];

    if let Some(dir) = extension_dir {
        extensions.extend(load_directory(dir, runner));
    }
    extensions
}
