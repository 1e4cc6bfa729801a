use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Settings for the EPUB archive kind: whether it is enabled and which
/// file types route to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EpubArchiveConfig {
    /// Whether EPUB archive support is enabled.
    pub enabled: bool,
    /// File extensions handled by this archive kind, dot included.
    pub file_types: Vec<String>,
}

impl Default for EpubArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_types: vec![".epub".to_string()],
        }
    }
}

impl EpubArchiveConfig {
    /// Whether a path should be routed to the EPUB archive kind.
    pub fn supports_path(&self, path: &Path) -> bool {
        if !self.enabled {
            return false;
        }
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_lowercase(),
            None => return false,
        };
        self.file_types
            .iter()
            .any(|file_type| name.ends_with(&file_type.to_lowercase()))
    }

    pub fn from_toml(raw: &str) -> Result<Self, ArchiveError> {
        toml::from_str(raw).map_err(|err| ArchiveError::Config(err.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ArchiveError> {
        toml::to_string_pretty(self).map_err(|err| ArchiveError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes_epub_paths() {
        let config = EpubArchiveConfig::default();
        assert!(config.supports_path(Path::new("/books/comic.epub")));
        assert!(config.supports_path(Path::new("COMIC.EPUB")));
        assert!(!config.supports_path(Path::new("/books/comic.cbz")));
    }

    #[test]
    fn disabled_routes_nothing() {
        let config = EpubArchiveConfig {
            enabled: false,
            ..EpubArchiveConfig::default()
        };
        assert!(!config.supports_path(Path::new("comic.epub")));
    }

    #[test]
    fn toml_round_trip() {
        let config = EpubArchiveConfig::default();
        let raw = config.to_toml().unwrap();
        let parsed = EpubArchiveConfig::from_toml(&raw).unwrap();
        assert_eq!(parsed.enabled, config.enabled);
        assert_eq!(parsed.file_types, config.file_types);
    }

    #[test]
    fn extra_file_types_are_honored() {
        let mut config = EpubArchiveConfig::default();
        config.file_types.push(".kepub".to_string());
        assert!(config.supports_path(Path::new("book.kepub")));
    }
}
