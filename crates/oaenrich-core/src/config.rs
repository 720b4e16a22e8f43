use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Browser identity sent to publisher pages; some of them reject default client identifiers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; SM-G996U Build/QP1A.190711.020; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Mobile Safari/537.36";

/// Root configuration, loaded from `~/.config/oaenrich/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub workbook: WorkbookConfig,
    pub enrichment: EnrichmentConfig,
    pub http: HttpConfig,
    pub institution: InstitutionConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    pub path: PathBuf,
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Re-run the open-access lookup even when the link column is already filled.
    pub overwrite_open_access_link: bool,
    pub populate_doi: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub zenodo_api_url: String,
    pub zenodo_record_url: String,
    pub request_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionConfig {
    pub domain: String,
    pub name: String,
    pub publisher_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("publications.xlsx"),
            sheets: vec![
                "YEAR 2024".to_string(),
                "YEAR 2023".to_string(),
                "YEAR 2022".to_string(),
            ],
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            overwrite_open_access_link: false,
            populate_doi: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            zenodo_api_url: "https://zenodo.org/api".to_string(),
            zenodo_record_url: "https://zenodo.org/records".to_string(),
            request_interval_ms: 0,
        }
    }
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            domain: "ucy.ac.cy".to_string(),
            name: "University of Cyprus".to_string(),
            publisher_marker: "ieee.org".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("pending_open_access.txt"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl EnrichConfig {
    /// Standard config file path: `~/.config/oaenrich/config.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("OAENRICH_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("oaenrich")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workbook.sheets.is_empty() {
            return Err(CoreError::ConfigError(
                "workbook.sheets must name at least one sheet".to_string(),
            ));
        }
        if self.institution.domain.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "institution.domain must not be empty".to_string(),
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "http.user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
