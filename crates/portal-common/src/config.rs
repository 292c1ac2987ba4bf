//! ---
//! portal_section: "01-core-functionality"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Shared primitives and utilities for the portal runtime."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use portal_pricing::Amount;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/portal.sqlite3")
}

fn default_cookie_name() -> String {
    "portal_session".to_owned()
}

fn default_crm_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pdf_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_currency() -> String {
    "EUR".to_owned()
}

fn default_vat_rate() -> String {
    "21".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the portal daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub company: CompanyConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "PORTAL_CONFIG";

    /// Load configuration from disk, respecting the `PORTAL_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.session.validate()?;
        if let Some(base_url) = &self.crm.base_url {
            validate_http_url("crm.base_url", base_url)?;
        }
        if let Some(endpoint) = &self.pdf.endpoint {
            validate_http_url("pdf.endpoint", endpoint)?;
        }
        self.pricing.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_http_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("{field} is not a valid url: {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("{field} must use http or https, got {other}")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                return Err(anyhow!(
                    "server static_dir {} does not exist or is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        let name = self.cookie_name.trim();
        if name.is_empty() {
            return Err(anyhow!("session cookie_name must not be empty"));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | ';' | ','))
        {
            return Err(anyhow!(
                "session cookie_name '{}' contains reserved characters",
                self.cookie_name
            ));
        }
        Ok(())
    }
}

/// Upstream CRM connection. The CRM is disabled when `base_url` is absent.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_crm_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: default_crm_timeout(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_pdf_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_pdf_timeout(),
        }
    }
}

/// Letterhead details printed on generated quotations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Percentage applied when a quotation carries no VAT rate of its own.
    #[serde(default = "default_vat_rate")]
    pub default_vat_rate: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_vat_rate: default_vat_rate(),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<()> {
        // Same parser the quotation pricing applies at request time.
        let rate: Amount = self.default_vat_rate.parse().with_context(|| {
            format!(
                "pricing default_vat_rate '{}' is not a number",
                self.default_vat_rate
            )
        })?;
        if rate.is_negative() || rate > Amount::HUNDRED {
            return Err(anyhow!(
                "pricing default_vat_rate {} must be between 0 and 100",
                self.default_vat_rate
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(anyhow!("pricing currency must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.session.cookie_name, "portal_session");
        assert_eq!(config.pricing.currency, "EUR");
        assert_eq!(config.crm.timeout, Duration::from_secs(10));
        assert!(config.crm.base_url.is_none());
    }

    #[test]
    fn parses_sections() {
        let raw = r#"
            [server]
            listen = "127.0.0.1:9000"

            [crm]
            base_url = "https://crm.example.test/api"
            api_key = "secret"
            timeout = 4

            [company]
            name = "Signs & Co"
            address_lines = ["Dock 4", "1011 AB Amsterdam"]

            [pricing]
            default_vat_rate = "9"

            [logging]
            format = "pretty"
        "#;
        let config = AppConfig::from_str(raw).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.crm.timeout, Duration::from_secs(4));
        assert_eq!(config.company.address_lines.len(), 2);
        assert_eq!(config.pricing.default_vat_rate, "9");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_non_http_crm_url() {
        let err = AppConfig::from_str("[crm]\nbase_url = \"ftp://crm.example.test\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("crm.base_url"), "{err}");
    }

    #[test]
    fn rejects_bad_vat_rate() {
        assert!(AppConfig::from_str("[pricing]\ndefault_vat_rate = \"abc\"\n").is_err());
        assert!(AppConfig::from_str("[pricing]\ndefault_vat_rate = \"120\"\n").is_err());
        assert!(AppConfig::from_str("[pricing]\ndefault_vat_rate = \"9,5\"\n").is_ok());
        assert!(AppConfig::from_str("[pricing]\ndefault_vat_rate = \"-1\"\n").is_err());
    }

    #[test]
    fn vat_rate_must_parse_as_a_pricing_amount() {
        let err = AppConfig::from_str("[pricing]\ndefault_vat_rate = \"1e1\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("default_vat_rate"), "{err}");
        assert!(AppConfig::from_str("[pricing]\ndefault_vat_rate = \" 9.5 \"\n").is_ok());
    }

    #[test]
    fn rejects_reserved_cookie_name() {
        assert!(AppConfig::from_str("[session]\ncookie_name = \"a b\"\n").is_err());
        assert!(AppConfig::from_str("[session]\ncookie_name = \"\"\n").is_err());
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        if std::env::var(AppConfig::ENV_CONFIG_PATH).is_ok() {
            return;
        }
        let err = AppConfig::load(&[&missing]).unwrap_err().to_string();
        assert!(err.contains("missing.toml"), "{err}");
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        if std::env::var(AppConfig::ENV_CONFIG_PATH).is_ok() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let present = dir.path().join("portal.toml");
        fs::write(&present, "[database]\npath = \"db/test.sqlite3\"\n").unwrap();

        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.database.path, PathBuf::from("db/test.sqlite3"));
    }
}
