//! Configuration management for veil.
//!
//! Parses `veil.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `output.dir`
//! - `encoder.command`
//! - `encoder.args`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override build output directory.
    pub output_dir: Option<PathBuf>,
    /// Override encoder program.
    pub encoder_command: Option<String>,
    /// Override maximum concurrent encoder calls.
    pub jobs: Option<usize>,
    /// Override rewrite rules enabled flag.
    pub rewrite_rules_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "veil.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// External encoder configuration.
    pub encoder: EncoderConfig,
    /// Rewrite rules file configuration.
    pub rewrite_rules: RewriteRulesConfig,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
}

/// Resolved output configuration with absolute paths.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Build root the bundler writes to.
    pub dir: PathBuf,
}

/// External encoder configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Program reading a script on stdin and printing the encoded form.
    pub command: String,
    /// Extra arguments passed to the program.
    pub args: Vec<String>,
    /// Maximum concurrent encoder calls (default: number of CPUs).
    pub jobs: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            command: "jscrewit".to_owned(),
            args: Vec::new(),
            jobs: None,
        }
    }
}

/// Rewrite rules configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RewriteRulesConfig {
    /// Whether `veil run` writes the rules file.
    pub enabled: bool,
    /// Document unmatched requests are routed to.
    pub fallback: String,
}

impl Default for RewriteRulesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback: "index.html".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`encoder.command`").
        field: String,
        /// Error message (e.g., "${`ENCODER`} environment variable not found").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `veil.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.output_resolved.dir.clone_from(output_dir);
        }
        if let Some(command) = &settings.encoder_command {
            self.encoder.command.clone_from(command);
        }
        if let Some(jobs) = settings.jobs {
            self.encoder.jobs = Some(jobs);
        }
        if let Some(enabled) = settings.rewrite_rules_enabled {
            self.rewrite_rules.enabled = enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            output: OutputConfigRaw::default(),
            encoder: EncoderConfig::default(),
            rewrite_rules: RewriteRulesConfig::default(),
            output_resolved: OutputConfig {
                dir: base.join("dist"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_encoder()?;
        self.validate_rewrite_rules()?;
        Ok(())
    }

    fn validate_encoder(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.encoder.command, "encoder.command")?;
        if self.encoder.jobs == Some(0) {
            return Err(ConfigError::Validation(
                "encoder.jobs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_rewrite_rules(&self) -> Result<(), ConfigError> {
        let fallback = &self.rewrite_rules.fallback;
        require_non_empty(fallback, "rewrite_rules.fallback")?;
        // Written unquoted into a RewriteRule directive
        if fallback.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "rewrite_rules.fallback cannot contain whitespace".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.output.dir {
            self.output.dir = Some(expand::expand_env(dir, "output.dir")?);
        }

        self.encoder.command = expand::expand_env(&self.encoder.command, "encoder.command")?;
        self.encoder.args = self
            .encoder
            .args
            .iter()
            .map(|arg| expand::expand_env(arg, "encoder.args"))
            .collect::<Result<_, _>>()?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.output_resolved = OutputConfig {
            dir: config_dir.join(self.output.dir.as_deref().unwrap_or("dist")),
        };
    }
}
