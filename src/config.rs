use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::i18n::Lang;

const DEFAULT_DB_PATH: &str = "camdash.db";
/// Settings file used when `CAMDASH_CONFIG` is unset.
pub const DEFAULT_PREFS_PATH: &str = "camdash_prefs.json";
const DEFAULT_PROBE_THREADS: usize = 8;
const DEFAULT_MAX_PREVIEWS: usize = 6;
const DEFAULT_PORT: u16 = 554;

pub const PROBE_THREADS_RANGE: (usize, usize) = (1, 32);
pub const MAX_PREVIEWS_RANGE: (usize, usize) = (1, 16);

#[derive(Debug, Deserialize, Serialize, Default)]
struct SettingsFile {
    db_path: Option<String>,
    probe_threads: Option<usize>,
    max_previews: Option<usize>,
    port: Option<u16>,
    smart_probe: Option<bool>,
    try_defaults: Option<bool>,
    lang: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: String,
    pub probe_threads: usize,
    pub max_previews: usize,
    pub port: u16,
    pub smart_probe: bool,
    pub try_defaults: bool,
    pub lang: Lang,
    /// Where `save` writes.
    pub source_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            probe_threads: DEFAULT_PROBE_THREADS,
            max_previews: DEFAULT_MAX_PREVIEWS,
            port: DEFAULT_PORT,
            smart_probe: true,
            try_defaults: false,
            lang: Lang::default(),
            source_path: PathBuf::from(DEFAULT_PREFS_PATH),
        }
    }
}

impl Settings {
    /// Load from `CAMDASH_CONFIG` (or the default prefs file when present), then
    /// apply `CAMDASH_*` overrides and clamp.
    pub fn load() -> Result<Self> {
        let (path, required) = match std::env::var("CAMDASH_CONFIG") {
            Ok(path) if !path.trim().is_empty() => (PathBuf::from(path), true),
            _ => (PathBuf::from(DEFAULT_PREFS_PATH), false),
        };
        let file_cfg = if required || path.exists() {
            read_settings_file(&path)?
        } else {
            SettingsFile::default()
        };
        let mut cfg = Self::from_file(file_cfg, path)?;
        cfg.apply_env()?;
        cfg.validate();
        Ok(cfg)
    }

    /// Load from an explicit file without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_settings_file(path)?, path.to_path_buf())?;
        cfg.validate();
        Ok(cfg)
    }

    fn from_file(file: SettingsFile, source_path: PathBuf) -> Result<Self> {
        let defaults = Self::default();
        let lang = match file.lang.as_deref() {
            Some(lang) => lang.parse()?,
            None => defaults.lang,
        };
        Ok(Self {
            db_path: file.db_path.unwrap_or(defaults.db_path),
            probe_threads: file.probe_threads.unwrap_or(defaults.probe_threads),
            max_previews: file.max_previews.unwrap_or(defaults.max_previews),
            port: file.port.unwrap_or(defaults.port),
            smart_probe: file.smart_probe.unwrap_or(defaults.smart_probe),
            try_defaults: file.try_defaults.unwrap_or(defaults.try_defaults),
            lang,
            source_path,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("CAMDASH_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(threads) = std::env::var("CAMDASH_PROBE_THREADS") {
            self.probe_threads = threads
                .trim()
                .parse()
                .map_err(|_| anyhow!("CAMDASH_PROBE_THREADS must be an integer"))?;
        }
        if let Ok(previews) = std::env::var("CAMDASH_MAX_PREVIEWS") {
            self.max_previews = previews
                .trim()
                .parse()
                .map_err(|_| anyhow!("CAMDASH_MAX_PREVIEWS must be an integer"))?;
        }
        if let Ok(port) = std::env::var("CAMDASH_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("CAMDASH_PORT must be a port number"))?;
        }
        if let Ok(lang) = std::env::var("CAMDASH_LANG") {
            if !lang.trim().is_empty() {
                self.lang = lang.parse()?;
            }
        }
        Ok(())
    }

    fn validate(&mut self) {
        self.probe_threads = self
            .probe_threads
            .clamp(PROBE_THREADS_RANGE.0, PROBE_THREADS_RANGE.1);
        self.max_previews = self
            .max_previews
            .clamp(MAX_PREVIEWS_RANGE.0, MAX_PREVIEWS_RANGE.1);
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
    }

    /// Persist to `source_path` (JSON, or TOML for a `.toml` path).
    pub fn save(&mut self) -> Result<()> {
        self.validate();
        let file = SettingsFile {
            db_path: Some(self.db_path.clone()),
            probe_threads: Some(self.probe_threads),
            max_previews: Some(self.max_previews),
            port: Some(self.port),
            smart_probe: Some(self.smart_probe),
            try_defaults: Some(self.try_defaults),
            lang: Some(self.lang.code().to_string()),
        };
        let body = if is_toml(&self.source_path) {
            toml::to_string_pretty(&file)?
        } else {
            serde_json::to_string_pretty(&file)?
        };
        std::fs::write(&self.source_path, body).map_err(|e| {
            anyhow!(
                "failed to write settings {}: {}",
                self.source_path.display(),
                e
            )
        })?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read settings file {}: {}", path.display(), e))?;
    let cfg = if is_toml(path) {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid settings file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid settings file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() -> Result<()> {
        let cfg = Settings::from_file(SettingsFile::default(), PathBuf::from("x.json"))?;
        assert_eq!(cfg.probe_threads, 8);
        assert_eq!(cfg.max_previews, 6);
        assert_eq!(cfg.port, 554);
        assert!(cfg.smart_probe);
        assert!(!cfg.try_defaults);
        assert_eq!(cfg.lang, Lang::Ar);
        Ok(())
    }

    #[test]
    fn validate_clamps_ranges() -> Result<()> {
        let file = SettingsFile {
            probe_threads: Some(99),
            max_previews: Some(0),
            port: Some(0),
            ..SettingsFile::default()
        };
        let mut cfg = Settings::from_file(file, PathBuf::from("x.json"))?;
        cfg.validate();
        assert_eq!(cfg.probe_threads, 32);
        assert_eq!(cfg.max_previews, 1);
        assert_eq!(cfg.port, 554);
        Ok(())
    }

    #[test]
    fn unknown_language_is_rejected() {
        let file = SettingsFile {
            lang: Some("fr".into()),
            ..SettingsFile::default()
        };
        assert!(Settings::from_file(file, PathBuf::from("x.json")).is_err());
    }
}
