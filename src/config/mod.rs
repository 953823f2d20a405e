#[cfg(feature = "cli")]
pub mod cli;
pub mod plan_config;

use crate::utils::error::Result;
use plan_config::PlanConfig;
use std::path::Path;

#[cfg(feature = "cli")]
pub use cli::{CliArgs, LogFormat};

/// Loads the plan file when one is given, otherwise the built-in plan.
pub fn load_plan_config(path: Option<&Path>) -> Result<PlanConfig> {
    match path {
        Some(path) => {
            tracing::info!("📁 Loading bootstrap plan from: {}", path.display());
            PlanConfig::from_file(path)
        }
        None => {
            tracing::debug!("Using built-in bootstrap plan");
            Ok(PlanConfig::default_plan())
        }
    }
}
