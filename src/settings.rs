use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::parser::SourceConfig;

pub const CONFIG_DIR_ENV: &str = "LEDGERKEEP_CONFIG_DIR";
const DB_FILE: &str = "ledgerkeep.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Statement layout per account id.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            sources: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    pub fn source_for(&self, account_id: &str) -> Option<&SourceConfig> {
        self.sources.get(account_id)
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerkeep")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledgerkeep")
}

/// Defaults when no settings file exists yet. A file that exists but does
/// not parse is an error: it may hold source layouts worth keeping.
pub fn load_settings() -> Result<Settings> {
    load_from(&settings_path())
}

fn load_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::file_access(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LedgerError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_to(&settings_path(), settings)
}

fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{DateOrder, SignConvention};
    use crate::parser::DialectKind;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("settings.json");
        let mut settings = Settings {
            data_dir: "/tmp/ledger".to_string(),
            ..Default::default()
        };
        let mut chase = SourceConfig::for_dialect(DialectKind::Delimited);
        chase.rules.sign = SignConvention::ExpensePositive;
        chase.rules.date_order = DateOrder::MonthFirst;
        settings.sources.insert("chase-1234".into(), chase.clone());
        save_to(&path, &settings).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/ledger");
        assert_eq!(loaded.source_for("chase-1234"), Some(&chase));
        assert!(loaded.source_for("other").is_none());
        assert_eq!(loaded.db_path(), PathBuf::from("/tmp/ledger").join("ledgerkeep.db"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_from(&dir.path().join("settings.json")).unwrap();
        assert!(s.sources.is_empty());
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_sources_default_when_absent() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/test"}"#).unwrap();
        assert!(s.sources.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_from(&path), Err(LedgerError::Settings(_))));
    }
}
