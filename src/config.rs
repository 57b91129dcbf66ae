//! Layered configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory
//! 3. `DUPLICUT_*` environment variables (e.g. `DUPLICUT_CONCURRENCY=8`)
//! 4. Command-line flags ([`ScanOverrides`])
//!
//! ```toml
//! concurrency = 16
//! buffer_size = 65536
//! algorithm = "blake3"
//! roots = ["/home/user/Pictures", "/mnt/backup/Pictures"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{FinderConfig, DEFAULT_CONCURRENCY};
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::HashAlgorithm;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPLICUT_";

/// Errors from loading, validating or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed or had the wrong shape.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Concurrency was set to 0.
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// Buffer size was set to 0.
    #[error("buffer_size must be at least 1")]
    InvalidBufferSize,

    /// The platform config directory could not be determined.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// Writing the config file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The config could not be rendered as TOML.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum hashing tasks in flight.
    pub concurrency: usize,
    /// Bytes per read.
    pub buffer_size: usize,
    /// Fingerprint digest.
    pub algorithm: HashAlgorithm,
    /// Roots scanned when none are given on the command line.
    pub roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            algorithm: HashAlgorithm::default(),
            roots: Vec::new(),
        }
    }
}

/// Command-line values layered on top of the file and environment.
/// `None` leaves the lower layers in effect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOverrides {
    /// `--concurrency`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// `--buffer-size`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    /// `--algorithm`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
}

impl Config {
    /// Default config file location, e.g. `~/.config/duplicut/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "duplicut", "duplicut")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the layered figment without CLI overrides.
    ///
    /// An explicit `path` must exist; the default path is used only if
    /// present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] if an explicit file is missing.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", default.display());
                    figment = figment.merge(Toml::file(default));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load, apply `overrides` and validate.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from parsing or validation.
    pub fn load(path: Option<&Path>, overrides: &ScanOverrides) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(path)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject a zero concurrency or buffer size.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidConcurrency`] or [`ConfigError::InvalidBufferSize`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }
        Ok(())
    }

    /// Scan settings derived from this config.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_concurrency(self.concurrency)
            .with_buffer_size(self.buffer_size)
            .with_algorithm(self.algorithm)
    }

    /// Write the config as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] or [`ConfigError::Write`].
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to [`Config::default_path`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] if no config directory is available, or
    /// any error from [`Config::save`].
    pub fn save_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)?;
        Ok(path)
    }
}
