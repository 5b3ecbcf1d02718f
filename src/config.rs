use std::path::Path;

use serde::Deserialize;

use crate::auth::AZURE_DEVOPS_RESOURCE;
use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = ".adoreview.toml";
pub const DEFAULT_API_VERSION: &str = "7.1";
pub const DEFAULT_TOKEN_ENV: &str = "ADO_BEARER_TOKEN";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_version: Option<String>,
    pub resource: Option<String>,
    pub token_env: Option<String>,
    pub az_binary: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_version: String,
    /// Audience the bearer token is requested for.
    pub resource: String,
    pub token_env: String,
    pub az_binary: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            resource: AZURE_DEVOPS_RESOURCE.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            az_binary: "az".to_string(),
            timeout_secs: 30,
            user_agent: format!("adoreview/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply CLI overrides.
    ///
    /// An explicit `--config` path must exist; the default path is optional.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config.as_deref() {
            Some(path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let config = merge(file_config, cli);
        validate_merged(&config)?;
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    let strings = [
        ("api_version", &config.api_version),
        ("resource", &config.resource),
        ("token_env", &config.token_env),
        ("az_binary", &config.az_binary),
        ("user_agent", &config.user_agent),
    ];
    for (name, value) in strings {
        if let Some(value) = value
            && value.trim().is_empty()
        {
            return Err(Error::ConfigValidation(format!("{name} must not be empty")));
        }
    }
    if let Some(timeout) = config.timeout_secs
        && timeout == 0
    {
        return Err(Error::ConfigValidation(
            "timeout_secs must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_merged(config: &Config) -> Result<()> {
    if config.api_version.trim().is_empty() {
        return Err(Error::ConfigValidation(
            "api version must not be empty".to_string(),
        ));
    }
    if config.timeout_secs == 0 {
        return Err(Error::ConfigValidation(
            "timeout must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    let defaults = Config::default();
    Config {
        api_version: cli
            .api_version
            .clone()
            .or(file.api_version)
            .unwrap_or(defaults.api_version),
        resource: file.resource.unwrap_or(defaults.resource),
        token_env: file.token_env.unwrap_or(defaults.token_env),
        az_binary: file.az_binary.unwrap_or(defaults.az_binary),
        timeout_secs: cli
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(defaults.timeout_secs),
        user_agent: file.user_agent.unwrap_or(defaults.user_agent),
    }
}
