use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Step '{step}' was terminated by signal {signal}")]
    StepTerminated { step: String, signal: i32 },

    #[error("Step '{step}' could not be started: {source}")]
    SpawnFailed {
        step: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not hand off to server '{program}': {source}")]
    ExecFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Working directory does not exist: {path}")]
    WorkingDirectoryMissing { path: String },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing environment variable: {name}")]
    MissingEnvError { name: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl BootstrapError {
    /// Exit status the runner terminates with when this error ends the bootstrap.
    ///
    /// Step failures propagate the step's own status; launch failures follow
    /// the shell conventions for "not found" (127) and "not executable" (126).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { code, .. } => *code,
            Self::StepTerminated { signal, .. } => 128 + signal,
            Self::SpawnFailed { source, .. } | Self::ExecFailed { source, .. } => {
                launch_exit_code(source)
            }
            _ => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::StepFailed { .. } | Self::StepTerminated { .. } => {
                "Check the step output above; the runner does not retry failed steps"
            }
            Self::SpawnFailed { .. } | Self::ExecFailed { .. } => {
                "Make sure the program is installed and on PATH in the deployment image"
            }
            Self::WorkingDirectoryMissing { .. } => {
                "Check plan.working_directory relative to the directory the runner starts in"
            }
            Self::MissingEnvError { .. } => {
                "Set the variable in the deployment platform or configure server.default_port"
            }
            Self::IoError(_) | Self::TomlError(_) => {
                "Make sure the plan file exists and is valid TOML"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the plan configuration and redeploy"
            }
        }
    }
}

fn launch_exit_code(error: &io::Error) -> i32 {
    match error.kind() {
        io::ErrorKind::NotFound => 127,
        io::ErrorKind::PermissionDenied => 126,
        _ => 1,
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
