use crate::error::IoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for a [`crate::Cellbase`].
///
/// ```
/// use cellbase::CellbaseConfig;
///
/// let config = CellbaseConfig::from_json_str(
///     r#"{"filename": "people.json", "schemas": {"people": ["id", "name"]}}"#,
/// )
/// .unwrap();
/// assert!(config.create_if_missing);
/// assert_eq!(config.location(), std::path::Path::new("./people.json"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellbaseConfig {
    /// Directory holding the workbook file.
    pub path: PathBuf,
    pub filename: String,
    /// Start from an empty workbook when the file is missing instead of failing.
    pub create_if_missing: bool,
    /// Worksheet schemas (ordered column names) registered at construction.
    pub schemas: BTreeMap<String, Vec<String>>,
}

impl Default for CellbaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            filename: "cellbase.json".to_string(),
            create_if_missing: true,
            schemas: BTreeMap::new(),
        }
    }
}

impl CellbaseConfig {
    pub fn new(path: impl AsRef<Path>, filename: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_schema<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// Full path of the workbook file.
    pub fn location(&self) -> PathBuf {
        self.path.join(&self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = CellbaseConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CellbaseConfig::default());
        assert_eq!(config.location(), PathBuf::from("./cellbase.json"));
    }

    #[test]
    fn builder_registers_schema() {
        let config = CellbaseConfig::new("/tmp", "book.json").with_schema("t", ["a", "b"]);
        assert_eq!(config.schemas["t"], vec!["a".to_string(), "b".to_string()]);
        assert!(CellbaseConfig::from_json_str("{\"create_if_missing\": 1}").is_err());
    }
}
