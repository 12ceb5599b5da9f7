//! Command-line configuration, read from a TOML file.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "lark-ide.toml";

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Read(path, e) => {
                write!(f, "could not read '{}': {}", path.display(), e)
            }
            ConfigError::Parse(path, e) => {
                write!(f, "invalid config '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdeConfig {
    /// Directory that relative grammar URIs resolve against
    pub grammar_root: PathBuf,

    /// Python interpreter with `lark` installed
    pub python: String,

    /// Where the theme preference is stored
    pub settings_path: PathBuf,
}

impl Default for IdeConfig {
    fn default() -> Self {
        IdeConfig {
            grammar_root: PathBuf::from("."),
            python: "python3".to_owned(),
            settings_path: PathBuf::from(".lark-ide.json"),
        }
    }
}

impl IdeConfig {
    pub fn parse(path: &Path, src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|e| ConfigError::Parse(path.to_owned(), e))
    }

    /// Load `path` if given, else `lark-ide.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let src = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Read(path.clone(), e))?;
        let config = Self::parse(&path, &src)?;
        log::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
