use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ToolError;
use crate::runner::{CommandRunner, SystemRunner};

const LINUX_CANDIDATES: &[PackageManager] = &[
    PackageManager::AptGet,
    PackageManager::Yum,
    PackageManager::Pacman,
];
const MACOS_CANDIDATES: &[PackageManager] = &[PackageManager::Brew];
const STDERR_DETAIL_LINES: usize = 5;

/// Answers whether an executable can be found on the host.
pub trait ExecutableProbe: Send + Sync {
    fn probe(&self, name: &str) -> bool;
}

/// Looks executables up on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProbe;

impl ExecutableProbe for PathProbe {
    fn probe(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let candidate = Path::new(name);
        if candidate.components().count() > 1 {
            return is_executable(candidate);
        }

        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| executable_names(name).iter().any(|n| is_executable(&dir.join(n))))
    }
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<PathBuf> {
    vec![PathBuf::from(name), PathBuf::from(format!("{}.exe", name))]
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<PathBuf> {
    vec![PathBuf::from(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Asks the operator a yes/no question.
pub trait Consent: Send + Sync {
    fn ask(&self, question: &str) -> bool;
}

/// Prompts on stderr and reads the answer from stdin. Anything but `y`/`yes` is no.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsent;

impl Consent for TerminalConsent {
    fn ask(&self, question: &str) -> bool {
        let mut stderr = std::io::stderr();
        if write!(stderr, "{} [y/N]: ", question).and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDeny;

impl Consent for AlwaysDeny {
    fn ask(&self, question: &str) -> bool {
        log::debug!("[resolver] consent_denied: question={}", question);
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

impl Consent for AlwaysAllow {
    fn ask(&self, question: &str) -> bool {
        log::debug!("[resolver] consent_granted: question={}", question);
        true
    }
}

/// Native package managers the resolver knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    AptGet,
    Yum,
    Pacman,
    Brew,
}

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::AptGet => "apt-get",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
        }
    }

    /// Ordered candidates for an OS family as named by `std::env::consts::OS`.
    pub fn candidates(os: &str) -> &'static [PackageManager] {
        match os {
            "linux" => LINUX_CANDIDATES,
            "macos" => MACOS_CANDIDATES,
            _ => &[],
        }
    }

    /// First candidate for `os` that is itself present.
    pub fn select(os: &str, probe: &dyn ExecutableProbe) -> Option<PackageManager> {
        Self::candidates(os)
            .iter()
            .copied()
            .find(|pm| probe.probe(pm.binary()))
    }

    /// Program and arguments that install `packages` in one invocation.
    pub fn install_command(&self, packages: &[String]) -> (String, Vec<String>) {
        let (program, mut args): (&str, Vec<&str>) = match self {
            PackageManager::AptGet => ("sudo", vec!["apt-get", "install", "-y"]),
            PackageManager::Yum => ("sudo", vec!["yum", "install", "-y"]),
            PackageManager::Pacman => ("sudo", vec!["pacman", "-S", "--noconfirm"]),
            PackageManager::Brew => ("brew", vec!["install"]),
        };
        args.extend(packages.iter().map(String::as_str));
        (program.to_string(), args.into_iter().map(String::from).collect())
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// What `ensure` found and did for one set of dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub required: Vec<String>,
    /// Dependencies that were absent when `ensure` started
    pub missing: Vec<String>,
    pub install_attempted: bool,
    /// `None` when no install was attempted
    pub install_succeeded: Option<bool>,
}

impl ResolutionOutcome {
    fn satisfied(required: &[String]) -> Self {
        Self {
            required: required.to_vec(),
            missing: Vec::new(),
            install_attempted: false,
            install_succeeded: None,
        }
    }
}

/// Checks capability dependencies and installs missing ones on consent.
pub struct DependencyResolver {
    probe: Arc<dyn ExecutableProbe>,
    consent: Arc<dyn Consent>,
    runner: Arc<dyn CommandRunner>,
    os: String,
}

impl DependencyResolver {
    pub fn new(
        probe: Arc<dyn ExecutableProbe>,
        consent: Arc<dyn Consent>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            probe,
            consent,
            runner,
            os: std::env::consts::OS.to_string(),
        }
    }

    /// Resolver backed by the real `PATH` and process runner.
    pub fn system(consent: Arc<dyn Consent>) -> Self {
        Self::new(Arc::new(PathProbe), consent, Arc::new(SystemRunner))
    }

    /// Override the OS family used for package manager selection.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    pub fn probe(&self, name: &str) -> bool {
        self.probe.probe(name)
    }

    /// Absent dependencies in declaration order, each named once.
    pub fn missing(&self, dependencies: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        dependencies
            .iter()
            .filter(|dep| seen.insert(dep.as_str()))
            .filter(|dep| !self.probe(dep))
            .cloned()
            .collect()
    }

    /// Make sure every dependency is present, or fail without running anything.
    pub async fn ensure(
        &self,
        dependencies: &[String],
        interactive: bool,
    ) -> Result<ResolutionOutcome, ToolError> {
        let missing = self.missing(dependencies);
        if missing.is_empty() {
            log::debug!("[resolver] satisfied: required={:?}", dependencies);
            return Ok(ResolutionOutcome::satisfied(dependencies));
        }

        log::info!("[resolver] missing_dependencies: missing={:?} interactive={}", missing, interactive);

        if !interactive {
            return Err(ToolError::UnsatisfiedDependency { missing });
        }

        let question = format!(
            "The following dependencies are missing: {}. Do you want to attempt to install them now?",
            missing.join(", ")
        );
        if !self.ask(question).await {
            log::info!("[resolver] install_declined: missing={:?}", missing);
            return Err(ToolError::UnsatisfiedDependency { missing });
        }

        let Some(manager) = PackageManager::select(&self.os, self.probe.as_ref()) else {
            log::warn!("[resolver] no_package_manager: os={}", self.os);
            return Err(ToolError::UnsatisfiedDependency { missing });
        };

        self.install(manager, &missing).await?;

        let still_missing = self.missing(&missing);
        if !still_missing.is_empty() {
            log::warn!("[resolver] still_missing_after_install: manager={} missing={:?}", manager, still_missing);
            return Err(ToolError::UnsatisfiedDependency { missing: still_missing });
        }

        Ok(ResolutionOutcome {
            required: dependencies.to_vec(),
            missing,
            install_attempted: true,
            install_succeeded: Some(true),
        })
    }

    /// Consent implementations may block on the terminal, so keep them off the runtime workers.
    async fn ask(&self, question: String) -> bool {
        let consent = Arc::clone(&self.consent);
        match tokio::task::spawn_blocking(move || consent.ask(&question)).await {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("[resolver] consent_failed: error={}", e);
                false
            }
        }
    }

    async fn install(&self, manager: PackageManager, packages: &[String]) -> Result<(), ToolError> {
        let (program, args) = manager.install_command(packages);
        log::info!("[resolver] installing: manager={} command={} {}", manager, program, args.join(" "));

        let result = self.runner.run(&program, &args).await.map_err(|e| {
            ToolError::DependencyInstall {
                manager: manager.to_string(),
                detail: format!("could not execute {}: {}", program, e),
            }
        })?;

        if !result.success() {
            let tail: Vec<&str> = result
                .stderr
                .lines()
                .rev()
                .take(STDERR_DETAIL_LINES)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            log::error!("[resolver] install_failed: manager={} status={}", manager, result.exit_status);
            return Err(ToolError::DependencyInstall {
                manager: manager.to_string(),
                detail: format!("exit status {}: {}", result.exit_status, tail.join("\n")),
            });
        }

        log::info!("[resolver] install_succeeded: manager={} packages={:?}", manager, packages);
        Ok(())
    }
}
