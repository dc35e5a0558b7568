//! Application configuration.
//!
//! Read once at startup from `$EXCEL_INSIGHTS_CONFIG` or
//! `<config dir>/excel-insights/config.json`. Every field has a default, so a
//! partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "EXCEL_INSIGHTS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SMTP relay, reached over implicit TLS.
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Where the PDF report is written.
    pub report_path: PathBuf,
    /// Rows shown in the report's data preview.
    pub preview_rows: usize,
    /// Characters per preview line before truncation.
    pub preview_line_width: usize,
    pub chart_width: u32,
    pub chart_height: u32,
    pub histogram_bins: usize,
    pub email_subject: String,
    pub email_body: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            report_path: PathBuf::from("report.pdf"),
            preview_rows: 20,
            preview_line_width: 90,
            chart_width: 800,
            chart_height: 400,
            histogram_bins: 20,
            email_subject: "Report".to_string(),
            email_body: "Please find the report attached.".to_string(),
        }
    }
}

impl AppConfig {
    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("excel-insights").join("config.json"))
    }

    /// Path from the environment override, else the default location.
    pub fn resolve_path() -> Result<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => Self::default_path(),
        }
    }

    /// Load from `path`; a missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

/// Load the configuration, falling back to defaults on any failure.
///
/// When no file exists yet the defaults are written out so they can be edited.
pub fn load_config() -> AppConfig {
    let loaded = AppConfig::resolve_path().and_then(|path| {
        log::debug!("Reading config from {}", path.display());
        let config = AppConfig::load_from(&path)?;
        if !path.exists() {
            if let Err(e) = config.save_to(&path) {
                log::warn!("Could not write default config: {e:#}");
            }
        }
        Ok(config)
    });
    match loaded {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Using default configuration: {e:#}");
            AppConfig::default()
        }
    }
}
