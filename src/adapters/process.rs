use crate::domain::model::{ServerLaunch, Step, StepStatus};
use crate::domain::ports::StepRunner;
use crate::utils::error::{BootstrapError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

/// Runs plan commands as real child processes of the runner.
///
/// Setup steps inherit stdin, stdout and stderr so their own output is the
/// diagnostic. The server replaces the runner through `exec` and keeps its PID.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepRunner for SystemRunner {
    async fn run(
        &self,
        step: &Step,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<StepStatus> {
        let mut cmd = tokio::process::Command::new(&step.program);
        cmd.args(&step.args)
            .current_dir(working_dir)
            .envs(env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd
            .status()
            .await
            .map_err(|source| BootstrapError::SpawnFailed {
                step: step.name.clone(),
                source,
            })?;

        tracing::debug!("Step {} exited with {}", step.name, status);
        Ok(step_status(status))
    }

    fn hand_off(
        &self,
        launch: &ServerLaunch,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> BootstrapError {
        let mut cmd = std::process::Command::new(&launch.program);
        cmd.args(&launch.args).current_dir(working_dir).envs(env);

        BootstrapError::ExecFailed {
            program: launch.program.clone(),
            source: replace_process(cmd),
        }
    }
}

#[cfg(unix)]
fn replace_process(mut cmd: std::process::Command) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    cmd.exec()
}

// No exec here: the server runs as a child and its status becomes ours.
#[cfg(not(unix))]
fn replace_process(mut cmd: std::process::Command) -> std::io::Error {
    match cmd.status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(source) => source,
    }
}

fn step_status(status: ExitStatus) -> StepStatus {
    if let Some(code) = status.code() {
        return StepStatus::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return StepStatus::Signaled(signal);
        }
    }

    StepStatus::Exited(1)
}
