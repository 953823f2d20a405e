use crate::domain::model::{BootstrapPlan, StepReport, StepStatus};
use crate::domain::ports::StepRunner;
use crate::utils::error::{BootstrapError, Result};
use std::time::Instant;

/// Runs the setup steps of a plan in order, then hands the process to the server.
pub struct BootstrapSequence<R: StepRunner> {
    plan: BootstrapPlan,
    runner: R,
    run_id: String,
}

impl<R: StepRunner> BootstrapSequence<R> {
    pub fn new(plan: BootstrapPlan, runner: R) -> Self {
        let run_id = format!("boot_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
        Self {
            plan,
            runner,
            run_id,
        }
    }

    pub fn with_run_id(mut self, run_id: String) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Runs every setup step, stopping at the first one that does not exit 0.
    pub async fn run_setup(&self) -> Result<Vec<StepReport>> {
        let working_dir = &self.plan.working_dir;
        if !working_dir.is_dir() {
            return Err(BootstrapError::WorkingDirectoryMissing {
                path: working_dir.display().to_string(),
            });
        }
        tracing::debug!("📁 Working directory: {}", working_dir.display());

        let mut reports = Vec::with_capacity(self.plan.steps.len());

        for step in &self.plan.steps {
            println!("{}", step.announce);
            tracing::info!(
                run_id = %self.run_id,
                step = %step.name,
                "▶️ {}",
                step.command_line()
            );

            let start_time = Instant::now();
            let dir = self.plan.step_dir(step);
            let env = self.plan.merged_env(&step.env);
            let status = self.runner.run(step, &dir, &env).await?;
            let duration = start_time.elapsed();

            match status {
                s if s.success() => {
                    tracing::info!("✅ Step completed: {} ({:?})", step.name, duration);
                    reports.push(StepReport {
                        step_name: step.name.clone(),
                        status,
                        duration,
                    });
                }
                StepStatus::Exited(code) => {
                    tracing::error!("❌ Step failed: {} (exit code {})", step.name, code);
                    return Err(BootstrapError::StepFailed {
                        step: step.name.clone(),
                        code,
                    });
                }
                StepStatus::Signaled(signal) => {
                    tracing::error!("❌ Step terminated: {} (signal {})", step.name, signal);
                    return Err(BootstrapError::StepTerminated {
                        step: step.name.clone(),
                        signal,
                    });
                }
            }
        }

        Ok(reports)
    }

    /// Starts the server in place of this process.
    pub fn launch(&self) -> BootstrapError {
        let server = &self.plan.server;
        println!("Starting server on {}", server.bind);
        tracing::info!(
            run_id = %self.run_id,
            bind = %server.bind,
            "🚀 {}",
            server.command_line()
        );

        let dir = self.plan.server_dir();
        let env = self.plan.merged_env(&server.env);
        self.runner.hand_off(server, &dir, &env)
    }

    /// Setup followed by hand-off. Only comes back with the error that stopped it.
    pub async fn run(&self) -> BootstrapError {
        match self.run_setup().await {
            Ok(reports) => {
                tracing::info!("📊 Setup summary: {}", Self::summary(&reports));
                self.launch()
            }
            Err(e) => e,
        }
    }

    pub fn summary(reports: &[StepReport]) -> serde_json::Value {
        let total_duration: std::time::Duration = reports.iter().map(|r| r.duration).sum();
        serde_json::json!({
            "total_steps": reports.len(),
            "total_duration_ms": total_duration.as_millis() as u64,
            "completed_steps": reports.iter().map(|r| r.step_name.as_str()).collect::<Vec<_>>(),
        })
    }
}
