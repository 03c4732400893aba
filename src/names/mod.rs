//! Display-name dictionary for maps and weapons.
//!
//! Loaded once at startup from a JSON file shaped like
//! `{"maps": {"Baltic_Main": "Erangel"}, "weapons": {"WeapHK416_C": "M416"}}`
//! and read-only afterwards. Unknown keys display as themselves.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameMaps {
    #[serde(default)]
    pub maps: HashMap<String, String>,
    #[serde(default)]
    pub weapons: HashMap<String, String>,
}

impl NameMaps {
    /// Load the dictionary. A missing or malformed file yields empty tables.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Name maps not loaded from {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<NameMaps>(&contents) {
            Ok(maps) => {
                info!(
                    "Loaded name maps: {} maps, {} weapons",
                    maps.maps.len(),
                    maps.weapons.len()
                );
                maps
            }
            Err(e) => {
                warn!("Name maps at {} are malformed: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn map_name(&self, key: &str) -> String {
        self.maps.get(key).cloned().unwrap_or_else(|| key.to_string())
    }

    pub fn weapon_name(&self, key: &str) -> String {
        self.weapons
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_and_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"maps": {{"Baltic_Main": "Erangel"}}, "weapons": {{"WeapHK416_C": "M416"}}}}"#
        )
        .unwrap();

        let names = NameMaps::load(file.path());
        assert_eq!(names.map_name("Baltic_Main"), "Erangel");
        assert_eq!(names.weapon_name("WeapHK416_C"), "M416");
        assert_eq!(names.weapon_name("WeapAK47_C"), "WeapAK47_C");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let names = NameMaps::load(Path::new("/nonexistent/nameMaps.json"));
        assert_eq!(names, NameMaps::default());
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert_eq!(NameMaps::load(file.path()), NameMaps::default());
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"maps": {{"Savage_Main": "Sanhok"}}}}"#).unwrap();
        let names = NameMaps::load(file.path());
        assert_eq!(names.map_name("Savage_Main"), "Sanhok");
        assert!(names.weapons.is_empty());
    }
}
