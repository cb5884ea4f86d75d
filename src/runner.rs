use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;

use crate::capability::RunResult;

const SIGNAL_EXIT_STATUS: i32 = -1;

/// Runs an external program to completion and captures its output.
///
/// Used both for wrapped scanning tools and for package manager installs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<RunResult>;
}

/// Runs programs on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<RunResult> {
        log::debug!("[runner] run: program={} args={:?}", program, args);

        let start = Instant::now();
        let output = match Command::new(program).args(args).output().await {
            Ok(out) => out,
            Err(e) => {
                log::error!("[runner] spawn_failed: program={} duration={}ms error={}",
                    program, start.elapsed().as_millis(), e);
                return Err(e);
            }
        };

        let exit_status = output.status.code().unwrap_or(SIGNAL_EXIT_STATUS);
        let result = RunResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status,
        };

        log::debug!("[runner] completed: program={} duration={}ms status={} stdout_len={} stderr_len={}",
            program, start.elapsed().as_millis(), exit_status, result.stdout.len(), result.stderr.len());

        Ok(result)
    }
}
