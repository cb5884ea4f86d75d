pub mod capability;
pub mod cli;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod logging;
pub mod pretty;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod tools;

// Re-export key types and functions at the crate root
pub use capability::{Capability, RunInput, RunResult};
pub use error::ToolError;
pub use gateway::Gateway;
pub use locator::validate_locator;
pub use logging::{get_log_file_path, init_logging};
pub use registry::{Discovery, DiscoveryDiagnostic, Extension, Registry};
pub use resolver::{DependencyResolver, ResolutionOutcome};
pub use runner::{CommandRunner, SystemRunner};
