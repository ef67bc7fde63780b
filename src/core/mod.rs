// Public modules
pub mod build;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hosts;
pub mod local;
pub mod orchestrator;
pub mod session;
pub mod ssh;
pub mod target;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use orchestrator::{DeploymentRun, Orchestrator, RunReport};
pub use session::{Session, SessionFactory};
pub use target::{DeployStep, DeployTarget};
