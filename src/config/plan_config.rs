use crate::domain::model::{BootstrapPlan, ServerLaunch, Step};
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKING_DIRECTORY: &str = "src";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    pub plan: PlanInfo,
    pub env: Option<BTreeMap<String, String>>,
    pub steps: Option<Vec<StepDefinition>>,
    pub server: ServerDefinition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanInfo {
    pub name: String,
    pub description: Option<String>,
    pub working_directory: Option<String>, // 預設 "src"
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub announce: Option<String>,
    pub program: String,
    pub args: Option<Vec<String>>,
    pub working_directory: Option<String>,
    pub enabled: Option<bool>,
    pub env: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerDefinition {
    pub program: String,
    pub args: Option<Vec<String>>, // 支援 {bind} {host} {port}
    pub host: Option<String>,
    pub port_env: Option<String>,
    pub default_port: Option<u16>,
    pub working_directory: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
}

impl PlanConfig {
    /// The deployment this runner ships with: collect static files, migrate,
    /// then serve the WSGI application on `0.0.0.0:$PORT`.
    pub fn default_plan() -> Self {
        let manage = |command: &str| {
            ["manage.py", command, "--noinput"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };

        Self {
            plan: PlanInfo {
                name: "web".to_string(),
                description: Some("Collect static files, migrate, start the web server".to_string()),
                working_directory: Some(DEFAULT_WORKING_DIRECTORY.to_string()),
            },
            env: None,
            steps: Some(vec![
                StepDefinition {
                    name: "collectstatic".to_string(),
                    announce: Some("Collecting static files...".to_string()),
                    program: "python".to_string(),
                    args: Some(manage("collectstatic")),
                    working_directory: None,
                    enabled: Some(true),
                    env: None,
                },
                StepDefinition {
                    name: "migrate".to_string(),
                    announce: Some("Applying database migrations...".to_string()),
                    program: "python".to_string(),
                    args: Some(manage("migrate")),
                    working_directory: None,
                    enabled: Some(true),
                    env: None,
                },
            ]),
            server: ServerDefinition {
                program: "gunicorn".to_string(),
                args: Some(vec![
                    "core.wsgi:application".to_string(),
                    "--bind".to_string(),
                    "{bind}".to_string(),
                ]),
                host: Some(DEFAULT_HOST.to_string()),
                port_env: Some(DEFAULT_PORT_ENV.to_string()),
                default_port: None,
                working_directory: None,
                env: None,
            },
        }
    }

    /// 從 TOML 檔案載入計畫配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_str(&content)
    }

    /// Parses a plan, substituting `${VAR}` references in string values from
    /// the process environment.
    pub fn from_str(content: &str) -> Result<Self> {
        Self::from_str_with_env(content, |name| std::env::var(name).ok())
    }

    pub fn from_str_with_env<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Substitute after parsing so values never go through TOML escaping.
        let mut document = toml::Value::Table(toml::from_str::<toml::Table>(content)?);
        let pattern = env_var_pattern()?;
        substitute_env_vars(&mut document, &pattern, &lookup);
        Ok(document.try_into::<PlanConfig>()?)
    }

    pub fn working_directory(&self) -> &str {
        self.plan
            .working_directory
            .as_deref()
            .unwrap_or(DEFAULT_WORKING_DIRECTORY)
    }

    pub fn port_env(&self) -> &str {
        self.server.port_env.as_deref().unwrap_or(DEFAULT_PORT_ENV)
    }

    pub fn host(&self) -> &str {
        self.server.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn get_enabled_steps(&self) -> Vec<&StepDefinition> {
        self.steps
            .iter()
            .flatten()
            .filter(|s| s.enabled.unwrap_or(true))
            .collect()
    }

    /// Resolves the port and builds the plan the runner executes.
    ///
    /// The port variable wins over `server.default_port`. Fails before any
    /// step could run when neither yields a usable port.
    pub fn into_plan<F>(&self, lookup: F) -> Result<BootstrapPlan>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.validate()?;

        let port_env = self.port_env();
        let port = match lookup(port_env) {
            Some(value) => validation::validate_port(port_env, &value)?,
            None => self
                .server
                .default_port
                .ok_or_else(|| BootstrapError::MissingEnvError {
                    name: port_env.to_string(),
                })?,
        };
        let ip = validation::validate_ip("server.host", self.host())?;
        let bind = SocketAddr::new(ip, port);

        let steps = self
            .get_enabled_steps()
            .into_iter()
            .map(|def| Step {
                name: def.name.clone(),
                announce: def
                    .announce
                    .clone()
                    .unwrap_or_else(|| format!("Running {}...", def.name)),
                program: def.program.clone(),
                args: def.args.clone().unwrap_or_default(),
                working_dir: def.working_directory.as_ref().map(PathBuf::from),
                env: def.env.clone().unwrap_or_default(),
            })
            .collect();

        let server = ServerLaunch {
            program: self.server.program.clone(),
            args: self
                .server
                .args
                .iter()
                .flatten()
                .map(|arg| render_bind_tokens(arg, &bind))
                .collect(),
            working_dir: self.server.working_directory.as_ref().map(PathBuf::from),
            env: self.server.env.clone().unwrap_or_default(),
            bind,
        };

        Ok(BootstrapPlan {
            name: self.plan.name.clone(),
            working_dir: PathBuf::from(self.working_directory()),
            env: self.env.clone().unwrap_or_default(),
            steps,
            server,
        })
    }
}

impl Validate for PlanConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("plan.name", &self.plan.name)?;
        validation::validate_non_empty_string("plan.working_directory", self.working_directory())?;

        let steps = self.steps.as_deref().unwrap_or_default();
        for step in steps {
            validation::validate_non_empty_string("steps.name", &step.name)?;
            validation::validate_non_empty_string(
                &format!("steps.{}.program", step.name),
                &step.program,
            )?;
        }
        validation::validate_unique_names("steps.name", steps.iter().map(|s| s.name.as_str()))?;

        validation::validate_non_empty_string("server.program", &self.server.program)?;
        validation::validate_ip("server.host", self.host())?;
        validation::validate_env_name("server.port_env", self.port_env())?;

        if self.server.default_port == Some(0) {
            return Err(BootstrapError::InvalidConfigValueError {
                field: "server.default_port".to_string(),
                value: "0".to_string(),
                reason: "Port must be between 1 and 65535".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var_pattern() -> Result<Regex> {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").map_err(|e| {
        BootstrapError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        }
    })
}

/// 替換環境變數 in every string value: `${VAR}` and `${VAR:-default}`.
/// Keys are left alone, and so are unset variables without a default.
fn substitute_env_vars<F>(value: &mut toml::Value, pattern: &Regex, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(text) => *text = expand_env_vars(text, pattern, lookup),
        toml::Value::Array(items) => {
            for item in items {
                substitute_env_vars(item, pattern, lookup);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                substitute_env_vars(item, pattern, lookup);
            }
        }
        _ => {}
    }
}

fn expand_env_vars<F>(text: &str, pattern: &Regex, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    pattern
        .replace_all(text, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match (lookup(var_name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn render_bind_tokens(arg: &str, bind: &SocketAddr) -> String {
    arg.replace("{bind}", &bind.to_string())
        .replace("{host}", &bind.ip().to_string())
        .replace("{port}", &bind.port().to_string())
}
