use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// A setup command that must exit successfully before the next one runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    /// Progress line printed before the step starts.
    pub announce: String,
    pub program: String,
    pub args: Vec<String>,
    /// Relative paths resolve against the plan working directory.
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl Step {
    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

/// The long-running server that replaces the runner once setup succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunch {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub bind: SocketAddr,
}

impl ServerLaunch {
    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub name: String,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub steps: Vec<Step>,
    pub server: ServerLaunch,
}

impl BootstrapPlan {
    /// Directory a step runs in: its own directory joined onto the plan's.
    pub fn step_dir(&self, step: &Step) -> PathBuf {
        match &step.working_dir {
            Some(dir) => self.working_dir.join(dir),
            None => self.working_dir.clone(),
        }
    }

    pub fn server_dir(&self) -> PathBuf {
        match &self.server.working_dir {
            Some(dir) => self.working_dir.join(dir),
            None => self.working_dir.clone(),
        }
    }

    /// Plan-wide variables overlaid with the command's own; the command wins.
    pub fn merged_env(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Exited(i32),
    Signaled(i32),
}

impl StepStatus {
    pub fn success(&self) -> bool {
        matches!(self, StepStatus::Exited(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step_name: String,
    pub status: StepStatus,
    pub duration: Duration,
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
