pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliArgs, LogFormat};

pub use adapters::process::SystemRunner;
pub use config::plan_config::PlanConfig;
pub use core::bootstrap::BootstrapSequence;
pub use utils::error::{BootstrapError, Result};
