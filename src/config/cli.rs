use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Deployment platforms invoke the runner with no arguments; every flag is optional.
#[derive(Debug, Clone, Parser)]
#[command(name = "deploy-bootstrap", version)]
#[command(about = "Collect static files, apply migrations, then exec the application server")]
pub struct CliArgs {
    /// TOML plan file; the built-in plan is used when omitted
    #[arg(short, long, env = "BOOTSTRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the resolved plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, env = "BOOTSTRAP_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_arguments() {
        let args = CliArgs::try_parse_from(["deploy-bootstrap"]).unwrap();
        assert!(!args.dry_run);
        assert!(!args.verbose);
    }

    #[test]
    fn test_all_flags() {
        let args = CliArgs::try_parse_from([
            "deploy-bootstrap",
            "--config",
            "deploy/bootstrap.toml",
            "--dry-run",
            "-v",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("deploy/bootstrap.toml")));
        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_positional_arguments() {
        assert!(CliArgs::try_parse_from(["deploy-bootstrap", "migrate"]).is_err());
    }
}
