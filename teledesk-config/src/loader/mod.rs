//! Config resolution: defaults, optional TOML file, environment overrides.

pub mod error;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::models::Config;
use error::ConfigLoadError;

const ENV_CONFIG_PATH: &str = "TELEDESK_CONFIG";
const ENV_BASE_URL: &str = "TELEDESK_BASE_URL";
const ENV_PAGE_SIZE: &str = "TELEDESK_PAGE_SIZE";
const ENV_TIMEOUT_SECS: &str = "TELEDESK_TIMEOUT_SECS";

const DEFAULT_CONFIG_FILE: &str = "teledesk.toml";

/// Values that take precedence over the config file, normally sourced from
/// `TELEDESK_*` environment variables but constructible directly (the CLI
/// maps its flags onto this, and tests avoid touching process env).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub page_size: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    /// Read overrides from the environment. `.env` files are honored first
    /// so local development matches the deployed contract.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            base_url: std::env::var(ENV_BASE_URL).ok(),
            page_size: parse_env(ENV_PAGE_SIZE)?,
            timeout_secs: parse_env(ENV_TIMEOUT_SECS)?,
        })
    }

    fn merge(self, other: Overrides) -> Overrides {
        Overrides {
            base_url: other.base_url.or(self.base_url),
            page_size: other.page_size.or(self.page_size),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigLoadError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| ConfigLoadError::InvalidValue {
                key: key.to_string(),
                reason: err.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// On-disk shape of `teledesk.toml`; every field optional so a partial file
/// only overrides what it names.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    http: HttpSection,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpSection {
    timeout_secs: Option<u64>,
}

/// Builder-style loader.
///
/// Precedence, lowest to highest: built-in defaults, TOML file, overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the loader at an explicit config file. Without this the loader
    /// consults `TELEDESK_CONFIG`, then `./teledesk.toml` if present.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = self.overrides.merge(overrides);
        self
    }

    pub fn load(self) -> Result<Config, ConfigLoadError> {
        let mut config = Config::default();

        if let Some(path) = self.resolve_path() {
            let file = read_config_file(&path)?;
            if let Some(base_url) = file.server.base_url {
                config.server.base_url = base_url;
            }
            if let Some(page_size) = file.store.page_size {
                config.store.page_size = page_size;
            }
            if let Some(timeout_secs) = file.http.timeout_secs {
                config.http.timeout_secs = timeout_secs;
            }
        }

        let overrides = self.overrides;
        if let Some(base_url) = overrides.base_url {
            config.server.base_url = base_url;
        }
        if let Some(page_size) = overrides.page_size {
            config.store.page_size = page_size;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            config.http.timeout_secs = timeout_secs;
        }

        validate(&config)?;
        Ok(config)
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Some(PathBuf::from(path));
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        fallback.exists().then(|| fallback.to_path_buf())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn validate(config: &Config) -> Result<(), ConfigLoadError> {
    Url::parse(&config.server.base_url).map_err(|err| ConfigLoadError::InvalidValue {
        key: "server.base_url".to_string(),
        reason: err.to_string(),
    })?;
    if config.store.page_size == 0 {
        return Err(ConfigLoadError::InvalidValue {
            key: "store.page_size".to_string(),
            reason: "page size must be at least 1".to_string(),
        });
    }
    Ok(())
}
