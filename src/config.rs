use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;

/// Read when no `--config` flag is given; absent means all defaults.
pub const DEFAULT_CONFIG_PATH: &str = "eurusd-derivative.toml";

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_user_agent() -> String {
    // Yahoo answers 429 to clients without a browser-like agent
    "Mozilla/5.0 (X11; Linux x86_64) eurusd-derivative/0.1".into()
}

fn default_chart_output() -> String {
    "eurusd_derivative.png".into()
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    1000
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartConfig {
    /// PNG file the chart is written to
    #[serde(default = "default_chart_output")]
    pub output: String,
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output: default_chart_output(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config = parse(&content)?;
    validate(&config)?;

    Ok(config)
}

/// Resolve the configuration for this run.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is used
/// when present and built-in defaults otherwise.
pub fn resolve(explicit: Option<&Path>) -> Result<AppConfig, Report<ConfigError>> {
    match explicit {
        Some(path) => load(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                load(fallback)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

fn parse(content: &str) -> Result<AppConfig, Report<ConfigError>> {
    toml::from_str(content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_log_format(config)?;
    validate_base_url(config)?;
    validate_chart(config)?;
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let format = config.general.log_format.as_str();
    if !VALID_LOG_FORMATS.contains(&format) {
        return Err(Report::new(ConfigError::Validation {
            field: format!("general.log_format \"{format}\" is not valid"),
        }));
    }
    Ok(())
}

fn validate_base_url(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let url = config.provider.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Report::new(ConfigError::Validation {
            field: format!("provider.base_url \"{url}\" must be an http(s) URL"),
        }));
    }
    Ok(())
}

fn validate_chart(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let chart = &config.chart;
    if chart.width == 0 || chart.height == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "chart dimensions must be non-zero (got {}x{})",
                chart.width, chart.height
            ),
        }));
    }
    if chart.output.trim().is_empty() {
        return Err(Report::new(ConfigError::Validation {
            field: "chart.output must not be empty".into(),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[provider]
base_url = "https://query2.finance.yahoo.com"
user_agent = "test-agent"

[chart]
output = "/tmp/eurusd.png"
width = 800
height = 600
"#;
        let config = parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.provider.base_url, "https://query2.finance.yahoo.com");
        assert_eq!(config.provider.user_agent, "test-agent");
        assert_eq!(config.chart.output, "/tmp/eurusd.png");
        assert_eq!((config.chart.width, config.chart.height), (800, 600));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn defaults_applied_when_sections_omitted() {
        let config = parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.provider.base_url, "https://query1.finance.yahoo.com");
        assert_eq!(config.chart.output, "eurusd_derivative.png");
        assert_eq!((config.chart.width, config.chart.height), (1200, 1000));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn defaults_applied_when_fields_omitted() {
        let config = parse("[chart]\nwidth = 640\n").unwrap();
        assert_eq!(config.chart.width, 640);
        assert_eq!(config.chart.height, 1000);
        assert_eq!(config.chart.output, "eurusd_derivative.png");
    }

    #[test]
    fn invalid_log_format_rejected() {
        let config = parse("[general]\nlog_format = \"xml\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn non_http_base_url_rejected() {
        let config = parse("[provider]\nbase_url = \"ftp://example.com\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_chart_dimensions_rejected() {
        let config = parse("[chart]\nheight = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = parse("[general\nlog_level = 1").unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let err = resolve(Some(Path::new("/nonexistent/eurusd-derivative.toml"))).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::ReadFile));
    }
}
