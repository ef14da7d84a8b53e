//! User configuration from `~/.hwdb/config.toml`.
//!
//! Every section is optional, and so is the file itself:
//!
//! ```toml
//! [database]
//! path = "${HOME}/hwdb/db.yaml"
//!
//! [licenses]
//! license_file = "licenses"
//! tres_file = "accountingStorageTRES"
//!
//! [logging]
//! filter = "hwdb=debug"
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_LICENSE_FILE: &str = "licenses";
pub const DEFAULT_TRES_FILE: &str = "accountingStorageTRES";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HwdbConfig {
    pub database: Option<DatabaseConfig>,
    pub licenses: Option<LicensesConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file; `${VAR}` references are expanded.
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicensesConfig {
    pub license_file: Option<String>,
    pub tres_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Replace `${VAR}` with the value of the environment variable `VAR`.
///
/// Unset variables and `${}` expand to nothing; an unclosed `${` is kept
/// verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &after[..close];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

impl HwdbConfig {
    /// Load the user config. `Ok(None)` when there is no home directory or no
    /// config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), "Failed to read config: {source}");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            tracing::warn!(path = %path.display(), "Failed to parse config: {source}");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Database path named by the config, with variables expanded.
    #[must_use]
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .as_ref()?
            .path
            .as_deref()
            .map(|path| PathBuf::from(expand_env_vars(path)))
    }

    #[must_use]
    pub fn license_file(&self) -> PathBuf {
        let configured = self
            .licenses
            .as_ref()
            .and_then(|licenses| licenses.license_file.as_deref());
        PathBuf::from(expand_env_vars(configured.unwrap_or(DEFAULT_LICENSE_FILE)))
    }

    #[must_use]
    pub fn tres_file(&self) -> PathBuf {
        let configured = self
            .licenses
            .as_ref()
            .and_then(|licenses| licenses.tres_file.as_deref());
        PathBuf::from(expand_env_vars(configured.unwrap_or(DEFAULT_TRES_FILE)))
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref()?.filter.as_deref()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hwdb").join("config.toml"))
}
