#![cfg(unix)]

use anyhow::Result;
use async_trait::async_trait;
use deploy_bootstrap::core::{ServerLaunch, Step, StepRunner, StepStatus};
use deploy_bootstrap::{BootstrapError, BootstrapSequence, PlanConfig, SystemRunner};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Runs steps for real but records the hand-off instead of replacing the test process.
#[derive(Default)]
struct RecordingRunner {
    inner: SystemRunner,
    launched: Mutex<Vec<(ServerLaunch, BTreeMap<String, String>)>>,
}

impl RecordingRunner {
    fn launched(&self) -> Vec<ServerLaunch> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .map(|(launch, _)| launch.clone())
            .collect()
    }
}

#[async_trait]
impl StepRunner for RecordingRunner {
    async fn run(
        &self,
        step: &Step,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> deploy_bootstrap::Result<StepStatus> {
        self.inner.run(step, working_dir, env).await
    }

    fn hand_off(
        &self,
        launch: &ServerLaunch,
        _working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> BootstrapError {
        self.launched
            .lock()
            .unwrap()
            .push((launch.clone(), env.clone()));
        BootstrapError::ExecFailed {
            program: launch.program.clone(),
            source: std::io::Error::other("recorded hand-off"),
        }
    }
}

fn plan_toml(dir: &Path, collect_script: &str, migrate_script: &str) -> String {
    format!(
        r#"
[plan]
name = "integration"
working_directory = "{}"

[env]
GREETING = "hello"

[[steps]]
name = "collectstatic"
announce = "Collecting static files..."
program = "sh"
args = ["-c", "{}"]

[[steps]]
name = "migrate"
announce = "Applying database migrations..."
program = "sh"
args = ["-c", "{}"]

[server]
program = "gunicorn"
args = ["core.wsgi:application", "--bind", "{{bind}}"]
"#,
        dir.display(),
        collect_script,
        migrate_script
    )
}

fn port_env(port: &str) -> impl Fn(&str) -> Option<String> {
    let vars = HashMap::from([("PORT".to_string(), port.to_string())]);
    move |name: &str| vars.get(name).cloned()
}

fn sequence(
    dir: &TempDir,
    collect_script: &str,
    migrate_script: &str,
) -> Result<BootstrapSequence<RecordingRunner>> {
    let config = PlanConfig::from_str_with_env(
        &plan_toml(dir.path(), collect_script, migrate_script),
        |_| None,
    )?;
    let plan = config.into_plan(port_env("8080"))?;
    Ok(BootstrapSequence::new(plan, RecordingRunner::default()))
}

#[tokio::test]
async fn test_successful_setup_hands_off_to_server() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(
        &temp_dir,
        "echo collectstatic >> steps.log",
        "echo migrate >> steps.log",
    )?;

    let error = sequence.run().await;

    assert!(matches!(error, BootstrapError::ExecFailed { .. }));
    let log = std::fs::read_to_string(temp_dir.path().join("steps.log"))?;
    assert_eq!(log, "collectstatic\nmigrate\n");

    let launched = sequence.runner().launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].bind.to_string(), "0.0.0.0:8080");
    assert_eq!(
        launched[0].args,
        vec!["core.wsgi:application", "--bind", "0.0.0.0:8080"]
    );

    Ok(())
}

#[tokio::test]
async fn test_collectstatic_failure_skips_migrate() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(&temp_dir, "exit 1", "touch migrated")?;

    let error = sequence.run().await;

    assert_eq!(error.exit_code(), 1);
    assert!(matches!(
        &error,
        BootstrapError::StepFailed { step, .. } if step == "collectstatic"
    ));
    assert!(!temp_dir.path().join("migrated").exists());
    assert!(sequence.runner().launched().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_migrate_failure_never_starts_server() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(&temp_dir, "touch collected", "exit 2")?;

    let error = sequence.run().await;

    assert_eq!(error.exit_code(), 2);
    assert!(temp_dir.path().join("collected").exists());
    assert!(sequence.runner().launched().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_step_killed_by_signal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(&temp_dir, "kill -TERM $$", "touch migrated")?;

    let error = sequence.run().await;

    assert!(matches!(error, BootstrapError::StepTerminated { signal: 15, .. }));
    assert_eq!(error.exit_code(), 143);
    assert!(!temp_dir.path().join("migrated").exists());

    Ok(())
}

#[tokio::test]
async fn test_steps_see_plan_environment() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(&temp_dir, "echo $GREETING > greeting.txt", "true")?;

    sequence.run_setup().await?;

    let greeting = std::fs::read_to_string(temp_dir.path().join("greeting.txt"))?;
    assert_eq!(greeting.trim(), "hello");

    Ok(())
}

#[tokio::test]
async fn test_rerun_produces_same_hand_off() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sequence = sequence(&temp_dir, "mkdir -p staticfiles", "true")?;

    sequence.run().await;
    sequence.run().await;

    let launched = sequence.runner().launched();
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[0], launched[1]);

    Ok(())
}

#[tokio::test]
async fn test_missing_step_program_exits_127() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = PlanConfig::from_str_with_env(
        &format!(
            r#"
[plan]
name = "missing"
working_directory = "{}"

[[steps]]
name = "collectstatic"
program = "definitely-not-an-installed-program"

[server]
program = "gunicorn"
default_port = 8000
"#,
            temp_dir.path().display()
        ),
        |_| None,
    )?;
    let sequence = BootstrapSequence::new(config.into_plan(|_| None)?, RecordingRunner::default());

    let error = sequence.run().await;

    assert!(matches!(error, BootstrapError::SpawnFailed { .. }));
    assert_eq!(error.exit_code(), 127);

    Ok(())
}

#[test]
fn test_failed_exec_returns_error() -> Result<()> {
    let config = PlanConfig::from_str_with_env(
        r#"
[plan]
name = "exec"

[server]
program = "definitely-not-an-installed-server"
args = ["--bind", "{bind}"]
"#,
        |_| None,
    )?;
    let plan = config.into_plan(port_env("8080"))?;

    // exec changes directory before it fails; "." keeps the test process where it is.
    let error = SystemRunner::new().hand_off(&plan.server, Path::new("."), &BTreeMap::new());

    assert!(matches!(error, BootstrapError::ExecFailed { .. }));
    assert_eq!(error.exit_code(), 127);

    Ok(())
}
