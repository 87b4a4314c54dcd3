use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "VIEWGRID_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub view: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub row_limit: Option<u64>,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    profiles: HashMap<String, Profile>,
}

impl CliConfig {
    /// Reads `explicit`, else `$VIEWGRID_CONFIG`, else the per-user default.
    /// A missing file is an empty config.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path,
            data,
            profiles,
        })
    }

    #[cfg(test)]
    fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let data: RawConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path: None,
            data,
            profiles,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn default_row_limit(&self) -> Option<u64> {
        self.data.row_limit
    }

    pub fn default_profile_name(&self) -> Option<&str> {
        self.data
            .default_profile
            .as_deref()
            .filter(|name| self.profiles.contains_key(*name))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile named on the command line, else the configured default.
    pub fn select_profile(&self, requested: Option<&str>) -> Result<Option<&Profile>, ConfigError> {
        match requested {
            Some(name) => self
                .profile(name)
                .map(Some)
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                }),
            None => Ok(self.default_profile_name().and_then(|name| self.profile(name))),
        }
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_profiles(data: &RawConfig) -> Result<HashMap<String, Profile>, ConfigError> {
    let mut profiles = HashMap::new();
    for (name, raw) in &data.profiles {
        profiles.insert(
            name.clone(),
            Profile {
                name: name.clone(),
                view: raw.view.clone(),
                state: raw.state.clone(),
                row_limit: raw.row_limit,
            },
        );
    }
    if let Some(default_name) = data.default_profile.as_ref() {
        if !profiles.contains_key(default_name) {
            return Err(ConfigError::ProfileNotFound {
                name: default_name.clone(),
            });
        }
    }
    Ok(profiles)
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    default_profile: Option<String>,
    #[serde(default)]
    row_limit: Option<u64>,
    #[serde(default)]
    profiles: HashMap<String, RawProfile>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawProfile {
    view: Option<PathBuf>,
    state: Option<PathBuf>,
    row_limit: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("viewgrid").join("cli.toml"))
}
