use clap::Parser;
use deploy_bootstrap::config::load_plan_config;
use deploy_bootstrap::core::BootstrapPlan;
use deploy_bootstrap::utils::logger;
use deploy_bootstrap::{BootstrapError, BootstrapSequence, CliArgs, LogFormat, SystemRunner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }

    tracing::info!("🚀 Starting deploy-bootstrap");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let plan = match load_plan(&args) {
        Ok(plan) => plan,
        Err(e) => fail(e),
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be executed");
        display_plan(&plan);
        return;
    }

    let sequence = BootstrapSequence::new(plan, SystemRunner::new());
    tracing::info!("🆔 Run ID: {}", sequence.run_id());

    // 只有在失敗時才會回來
    let error = sequence.run().await;
    fail(error)
}

fn load_plan(args: &CliArgs) -> deploy_bootstrap::Result<BootstrapPlan> {
    let config = load_plan_config(args.config.as_deref())?;
    config.into_plan(|name| std::env::var(name).ok())
}

fn fail(error: BootstrapError) -> ! {
    let exit_code = error.exit_code();
    tracing::error!("❌ Bootstrap failed: {} (exit code {})", error, exit_code);
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

    eprintln!("❌ {}", error);
    eprintln!("💡 {}", error.recovery_suggestion());
    std::process::exit(exit_code)
}

fn display_plan(plan: &BootstrapPlan) {
    println!("📋 Bootstrap Plan: {}", plan.name);
    println!("  Working directory: {}", plan.working_dir.display());
    if !plan.env.is_empty() {
        println!(
            "  Environment: {}",
            plan.env.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    println!();

    println!("📝 Setup steps:");
    if plan.steps.is_empty() {
        println!("  (none)");
    }
    for (index, step) in plan.steps.iter().enumerate() {
        println!("  {}. {} - {}", index + 1, step.name, step.command_line());
        println!("     Directory: {}", plan.step_dir(step).display());
    }
    println!();

    println!("🌐 Server:");
    println!("  Command: {}", plan.server.command_line());
    println!("  Bind: {}", plan.server.bind);
    println!("  Directory: {}", plan.server_dir().display());
}
