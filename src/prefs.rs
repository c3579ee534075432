use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::filename::WhitespaceStyle;

/// The one persisted preference: how whitespace is written in filenames.
/// Missing or unreadable files degrade to defaults, never to an error.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(rename = "whitespaceOption", skip_serializing_if = "Option::is_none")]
    pub whitespace_option: Option<String>,
}

impl Preferences {
    pub fn load() -> Self {
        match default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                debug!("Ignoring unreadable preference file {:?}: {}", path, err);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        match default_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn whitespace_style(&self) -> WhitespaceStyle {
        self.whitespace_option
            .as_deref()
            .map(WhitespaceStyle::parse)
            .unwrap_or(WhitespaceStyle::Space)
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arxiv-fetch").join("prefs.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("nested").join("prefs.json");

        let prefs = Preferences {
            whitespace_option: Some("underscore".to_string()),
        };
        prefs.save_to(&path).unwrap();

        let loaded = Preferences::load_from(&path);
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.whitespace_style(), WhitespaceStyle::Underscore);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let loaded = Preferences::load_from(&tmp_dir.path().join("absent.json"));
        assert_eq!(loaded, Preferences::default());
        assert_eq!(loaded.whitespace_style(), WhitespaceStyle::Space);
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(Preferences::load_from(&path), Preferences::default());
    }

    #[test]
    fn test_storage_key_name() {
        let prefs = Preferences {
            whitespace_option: Some("hyphen".to_string()),
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"whitespaceOption\":\"hyphen\""));
    }
}
