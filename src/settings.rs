//! Persistent configuration: where the sheet lives and how to reach it.

use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vQ9b2FKBRe00ngdkBE8bSiC47MDdGJROwM-6FtxRy8htDIev5BZ5Z-SyxAXtz_2KzLxyHn-MiEcJaCj/pub?gid=784473971&single=true&output=csv";
pub const SHEET_URL_ENV: &str = "FLAVIN_SHEET_URL";

fn default_sheet_url() -> String {
    DEFAULT_SHEET_URL.to_string()
}

fn default_rest_done_millis() -> u64 {
    1500
}

/// User configuration, stored as JSON in the platform config directory.
///
/// Every field has a serde default so partial or older files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_sheet_url")]
    pub sheet_url: String,
    /// CORS relay prefix; the encoded sheet URL is appended to it.
    #[serde(default)]
    pub cors_proxy: Option<String>,
    #[serde(default = "default_rest_done_millis")]
    pub rest_done_millis: u64,
    #[serde(default)]
    pub store_file: Option<PathBuf>,
    /// Set when the file on disk could not be parsed; it is then left alone.
    #[serde(skip)]
    keep_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_url: default_sheet_url(),
            cors_proxy: None,
            rest_done_millis: default_rest_done_millis(),
            store_file: None,
            keep_file: false,
        }
    }
}

/// Pick the sheet URL, letting [`SHEET_URL_ENV`] win over the settings file.
pub fn resolve_sheet_url(settings_url: &str) -> String {
    std::env::var(SHEET_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| settings_url.to_string())
}

impl Settings {
    const FILE: &'static str = "flavin_shape_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        log::warn!("Ignoring invalid settings {}: {e}", path.display());
                        return Self {
                            keep_file: true,
                            ..Self::default()
                        };
                    }
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        if self.keep_file {
            log::warn!("Not overwriting settings file that failed to parse");
            return;
        }
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(e) = std::fs::write(&path, data) {
                        log::error!("Failed to save settings: {e}");
                    }
                }
                Err(e) => log::error!("Failed to serialize settings: {e}"),
            }
        }
    }

    /// URL actually requested, relayed through `cors_proxy` when set.
    pub fn fetch_url(&self) -> Result<String, url::ParseError> {
        let sheet = resolve_sheet_url(&self.sheet_url);
        url::Url::parse(&sheet)?;
        let full = match self.cors_proxy.as_deref().map(str::trim) {
            Some(proxy) if !proxy.is_empty() => {
                let encoded: String = url::form_urlencoded::byte_serialize(sheet.as_bytes()).collect();
                format!("{proxy}{encoded}")
            }
            _ => sheet,
        };
        Ok(url::Url::parse(&full)?.to_string())
    }

    pub fn done_window(&self) -> Duration {
        Duration::from_millis(self.rest_done_millis)
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_file
            .clone()
            .or_else(crate::storage::FileStore::default_path)
    }
}
