//! `rekap.toml` configuration
//!
//! ```toml
//! [school]
//! name = "SMP Negeri 1 Contoh"
//!
//! [teachers]
//! "7A" = "Dewi Anggraini, S.Pd."
//!
//! [store]
//! page_size = 1000
//!
//! [pivot]
//! unknown_status = "reject"
//! ```
//!
//! Values are passed explicitly into every recap; nothing here is read from a
//! global. A class without a `[teachers]` entry has no implicit fallback.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, UnknownStatus};

/// Default page size for range queries; matches common hosted-backend row caps
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecapConfig {
    pub school: SchoolConfig,
    /// Class id → class teacher name
    pub teachers: BTreeMap<String, String>,
    pub store: StoreConfig,
    pub pivot: PivotConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchoolConfig {
    pub name: String,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: "SEKOLAH".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PivotConfig {
    pub unknown_status: UnknownStatus,
}

impl RecapConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse config text; `origin` is used in error messages only
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: RecapConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        if config.store.page_size == 0 {
            return Err(ConfigError::Parse {
                path: origin.to_string(),
                message: "store.page_size must be at least 1".into(),
            });
        }
        Ok(config)
    }

    pub fn teacher_for(&self, class_id: &str) -> Option<&str> {
        self.teachers.get(class_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = RecapConfig::default();
        assert_eq!(config.store.page_size, 1000);
        assert_eq!(config.pivot.unknown_status, UnknownStatus::Reject);
        assert_eq!(config.teacher_for("7A"), None);
    }

    #[test]
    fn parse_full_config() {
        let config = RecapConfig::parse(
            r#"
            [school]
            name = "SMP Negeri 1 Contoh"

            [teachers]
            "7A" = "Dewi Anggraini"

            [store]
            page_size = 250

            [pivot]
            unknown_status = "present"
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.school.name, "SMP Negeri 1 Contoh");
        assert_eq!(config.teacher_for("7A"), Some("Dewi Anggraini"));
        assert_eq!(config.store.page_size, 250);
        assert_eq!(config.pivot.unknown_status, UnknownStatus::TreatAsPresent);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = RecapConfig::parse("[school]\nname = \"X\"\n", "inline").unwrap();
        assert_eq!(config.store.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = RecapConfig::parse("[store]\npage_size = 0\n", "inline").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(RecapConfig::parse("[school]\nnmae = \"typo\"\n", "inline").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[teachers]\n\"8B\" = \"Budi\"").unwrap();
        let config = RecapConfig::load(file.path()).unwrap();
        assert_eq!(config.teacher_for("8B"), Some("Budi"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = RecapConfig::load(Path::new("/nonexistent/rekap.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
