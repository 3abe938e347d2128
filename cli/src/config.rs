//! Configuration for the `tasks` command-line client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasks-cli/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use tasks_core::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use tasks_core::ClientConfig;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A timeout of zero would fail every request.
    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    log: LogFileConfig,
}

/// `[api]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `[log]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LogFileConfig {
    level: Option<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Global options shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Base URL of the tasks API.
    #[arg(long, global = true, env = "TASKS_API_URL")]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "TASKS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Path to config file (default: `~/.config/tasks-cli/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "TASKS_LOG")]
    pub log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub client: ClientConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration by merging CLI args, env vars and a TOML file.
    ///
    /// An explicit `--config` that does not exist is an error; a missing
    /// default file is treated as empty.
    pub fn load(args: &SettingsArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(args.config.as_deref())?;
        Self::resolve(args, &file)
    }

    /// Priority: CLI > file > default.
    fn resolve(args: &SettingsArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let timeout = match args.timeout_secs.or(file.api.timeout_secs) {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };
        let base_url = args
            .api_url
            .clone()
            .or_else(|| file.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: ClientConfig {
                base_url,
                timeout,
                ..ClientConfig::default()
            },
            log_level: args
                .log_level
                .clone()
                .or_else(|| file.log.level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasks-cli").join("config.toml"))
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = explicit_path {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(path) = default_config_path() else {
        return Ok(ConfigFile::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> ConfigFile {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::resolve(&SettingsArgs::default(), &parse("")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.client.base_url, "http://localhost:8080/api/tasks");
        assert_eq!(config.client.timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn file_values_apply() {
        let file = parse(
            r#"
[api]
base_url = "http://tasks.internal/api/tasks"
timeout_secs = 3

[log]
level = "debug"
"#,
        );
        let config = Config::resolve(&SettingsArgs::default(), &file).unwrap();

        assert_eq!(config.client.base_url, "http://tasks.internal/api/tasks");
        assert_eq!(config.client.timeout, Duration::from_secs(3));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = parse("[api]\ntimeout_secs = 30\n");
        let config = Config::resolve(&SettingsArgs::default(), &file).unwrap();

        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn cli_overrides_file() {
        let file = parse("[api]\nbase_url = \"http://from-file\"\ntimeout_secs = 3\n");
        let args = SettingsArgs {
            api_url: Some("http://from-cli".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(&args, &file).unwrap();

        assert_eq!(config.client.base_url, "http://from-cli");
        assert_eq!(config.client.timeout, Duration::from_secs(3)); // from file
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = SettingsArgs {
            timeout_secs: Some(0),
            ..Default::default()
        };
        let result = Config::resolve(&args, &ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn mistyped_value_is_a_parse_error() {
        let result: Result<ConfigFile, _> = toml::from_str("[api]\ntimeout_secs = \"soon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_missing_config_file_returns_error() {
        let result = load_config_file(Some(Path::new("/nonexistent/tasks-cli.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
