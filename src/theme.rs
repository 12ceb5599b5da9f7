//! The persisted light/dark preference.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Storage

/// A string key-value store in the manner of browser local storage.
pub trait Storage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), String>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage(IndexMap<String, String>);

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Storage kept as a JSON object in a file.
///
/// A missing or unreadable file reads as empty storage.
pub struct FileStorage {
    path: PathBuf,
    items: IndexMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                IndexMap::new()
            }),
            Err(_) => IndexMap::new(),
        };
        FileStorage { path, items }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.items.insert(key.to_owned(), value.to_owned());
        let contents =
            serde_json::to_string_pretty(&self.items).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, contents).map_err(|e| e.to_string())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Settings

pub struct ThemeSettings<S: Storage> {
    storage: S,
    theme: Theme,
}

impl<S: Storage> ThemeSettings<S> {
    /// Read the stored theme; anything unrecognized means dark.
    pub fn load(storage: S) -> Self {
        let theme = storage
            .get_item(THEME_KEY)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        ThemeSettings { storage, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark_mode(&self) -> bool {
        self.theme == Theme::Dark
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), String> {
        self.theme = theme;
        self.storage.set_item(THEME_KEY, theme.as_str())
    }

    pub fn toggle(&mut self) -> Result<Theme, String> {
        let theme = self.theme.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}
