//! Service configuration file (`config.yaml`)
//!
//! Every section is optional. `${VAR}` references anywhere in the file are
//! replaced with the environment value (empty when unset) before parsing.

use anyhow::{Context, Result};
use backoffice_access_log::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub database: DatabaseSection,
    pub jwt: JwtSection,
    pub log_pipeline: PipelineConfig,
    pub cors: CorsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub bind_addr: String,
    /// `production` switches logs to JSON
    pub env: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "backoffice".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            env: "development".to_string(),
        }
    }
}

impl AppSection {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://backoffice.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSection {
    pub secret: String,
    pub expires_hours: u32,
    pub issuer: String,
    /// Path substrings that bypass authentication
    pub skip_auth_urls: Vec<String>,
}

impl Default for JwtSection {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expires_hours: 24,
            issuer: "backoffice".to_string(),
            skip_auth_urls: backoffice_api::default_skip_auth_paths(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    pub enabled: bool,
    /// Empty means localhost origins only
    pub origins: Vec<String>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from `path`; a missing file yields the defaults.
    ///
    /// The result is not validated so command-line overrides can be applied first.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content)
    }

    /// Parse config from YAML string
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&expanded).context("Failed to parse YAML config")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret.trim().is_empty() {
            anyhow::bail!(
                "jwt.secret must be set (config file, --jwt-secret or BACKOFFICE_JWT_SECRET)"
            );
        }
        if self.jwt.expires_hours == 0 {
            anyhow::bail!("jwt.expires_hours must be greater than 0");
        }

        let pipeline = &self.log_pipeline;
        if pipeline.channel_capacity == 0 {
            anyhow::bail!("log_pipeline.channel_capacity must be greater than 0");
        }
        if pipeline.batch_size == 0 {
            anyhow::bail!("log_pipeline.batch_size must be greater than 0");
        }
        if pipeline.flush_interval_secs == 0 {
            anyhow::bail!("log_pipeline.flush_interval_secs must be greater than 0");
        }
        if !(-23..=23).contains(&pipeline.timezone_offset_hours) {
            anyhow::bail!(
                "log_pipeline.timezone_offset_hours must be between -23 and 23, got {}",
                pipeline.timezone_offset_hours
            );
        }

        Ok(())
    }
}

/// Expand environment variables in a string
///
/// Supports `${VAR}` syntax. If the variable is not set, it expands to an empty string.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").context("Invalid env var pattern")?;

    let mut result = input.to_string();
    for cap in re.captures_iter(input) {
        let value = std::env::var(&cap[1]).unwrap_or_default();
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_access_log::LogStoreKind;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.jwt.expires_hours, 24);
        assert_eq!(config.log_pipeline.batch_size, 100);
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
app:
  bind_addr: "127.0.0.1:9000"
jwt:
  secret: "s3cret"
log_pipeline:
  batch_size: 50
  store: memory
"#;
        let config = AppConfig::parse(yaml).unwrap();

        assert_eq!(config.app.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.app.name, "backoffice");
        assert_eq!(config.jwt.secret, "s3cret");
        assert_eq!(config.jwt.issuer, "backoffice");
        assert_eq!(config.log_pipeline.batch_size, 50);
        assert_eq!(config.log_pipeline.channel_capacity, 10_000);
        assert_eq!(config.log_pipeline.store, LogStoreKind::Memory);
        assert!(config.cors.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file_with_env_expansion() {
        std::env::set_var("BACKOFFICE_TEST_DB_URL", "sqlite::memory:");
        std::env::set_var("BACKOFFICE_TEST_SECRET", "from-env");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  url: \"${{BACKOFFICE_TEST_DB_URL}}\"\njwt:\n  secret: \"${{BACKOFFICE_TEST_SECRET}}\"\n  skip_auth_urls: [\"/api/auth/login\"]"
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.jwt.secret, "from-env");
        assert_eq!(config.jwt.skip_auth_urls, vec!["/api/auth/login"]);
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jwt: [not, a, map").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jwt.secret"));

        config.jwt.secret = "s3cret".to_string();
        config.validate().unwrap();

        config.log_pipeline.batch_size = 0;
        assert!(config.validate().is_err());
        config.log_pipeline.batch_size = 100;

        config.log_pipeline.channel_capacity = 0;
        assert!(config.validate().is_err());
        config.log_pipeline.channel_capacity = 10;

        config.log_pipeline.flush_interval_secs = 0;
        assert!(config.validate().is_err());
        config.log_pipeline.flush_interval_secs = 5;

        config.log_pipeline.timezone_offset_hours = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("BACKOFFICE_TEST_VAR", "value");
        assert_eq!(expand_env_vars("${BACKOFFICE_TEST_VAR}").unwrap(), "value");
        assert_eq!(
            expand_env_vars("a_${BACKOFFICE_TEST_VAR}_b").unwrap(),
            "a_value_b"
        );
        assert_eq!(expand_env_vars("plain").unwrap(), "plain");
        assert_eq!(expand_env_vars("${BACKOFFICE_TEST_UNSET_VAR}").unwrap(), "");
    }

    #[test]
    fn test_production_env() {
        let mut app = AppSection::default();
        assert!(!app.is_production());
        app.env = "Production".to_string();
        assert!(app.is_production());
    }
}
