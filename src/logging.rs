use std::fs;
use std::io::Write;
use std::path::PathBuf;
use log::LevelFilter;

/// Initialize logging to a system-specific log file
///
/// `verbose` raises the default level to debug; `RUST_LOG` still wins when set.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = get_log_file_path()?;

    // Ensure the log directory exists
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(default_level);

    // One timestamped line per record, appended across runs
    env_logger::Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?
        )))
        // Errors if a logger is already installed
        .try_init()?;

    log::info!("Logging initialized to: {}", log_path.display());
    log::info!("Log level: {}", log_level);

    Ok(())
}

/// Get the system-specific log file path
pub fn get_log_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = if cfg!(target_os = "macos") {
        // ~/Library/Logs/bughunter/
        dirs::home_dir()
            .ok_or("Could not find home directory")?
            .join("Library")
            .join("Logs")
            .join("bughunter")
    } else if cfg!(target_os = "linux") && is_root() {
        PathBuf::from("/var/log/bughunter")
    } else {
        // ~/.local/share/bughunter/logs/ on Linux, the platform data dir elsewhere
        dirs::data_local_dir()
            .ok_or("Could not find local data directory")?
            .join("bughunter")
            .join("logs")
    };

    Ok(log_dir.join("bughunter.log"))
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::getuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
