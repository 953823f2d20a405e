use crate::domain::model::{ServerLaunch, Step, StepStatus};
use crate::utils::error::{BootstrapError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Executes the commands of a bootstrap plan.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Runs a setup step to completion and reports how it ended.
    async fn run(
        &self,
        step: &Step,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<StepStatus>;

    /// Replaces the current process with the server. Returns only on failure.
    fn hand_off(
        &self,
        launch: &ServerLaunch,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> BootstrapError;
}
