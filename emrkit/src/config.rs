// emrkit/src/config.rs
//
// Console configuration: YAML file + EMR_CONSOLE__* environment overrides

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::errors::EmrError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
    pub preferences: PreferencesConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Path segment after `/patients/:id/` for the AI summary.
    pub summary_endpoint: String,
    /// Path segment after `/patients/:id/` for the predictive analysis.
    pub analysis_endpoint: String,
    /// Unset means the transport default applies.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            summary_endpoint: "summary".to_string(),
            analysis_endpoint: "predictive-analysis".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Filter the loaded list in memory.
    #[default]
    Local,
    /// Ask `/patients/search` for every term.
    Remote,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub search_mode: SearchMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Preferences file; defaults to `<config dir>/emr-console/preferences.json`.
    pub path: Option<PathBuf>,
}

impl PreferencesConfig {
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("emr-console")
                .join("preferences.json")
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "emr_console=info,emrkit=info".to_string(),
            log_file: PathBuf::from("emr-console.log"),
        }
    }
}

/// Layer the optional YAML file and the environment over the defaults.
pub fn load_config(path: &str) -> Result<ConsoleConfig, EmrError> {
    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::with_prefix("EMR_CONSOLE").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = load_config("does/not/exist/emr-console").unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.dashboard.search_mode, SearchMode::Local);
        assert!(config.api.request_timeout().is_none());
    }

    #[test]
    fn test_yaml_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api:\n  base_url: https://emr.example.org/api\n  summary_endpoint: summary-perplexity\n  request_timeout_secs: 30\ndashboard:\n  search_mode: remote\n"
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api.base_url, "https://emr.example.org/api");
        assert_eq!(config.api.summary_endpoint, "summary-perplexity");
        assert_eq!(config.api.analysis_endpoint, "predictive-analysis");
        assert_eq!(config.api.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.dashboard.search_mode, SearchMode::Remote);
    }

    #[test]
    fn test_explicit_preferences_path() {
        let prefs = PreferencesConfig { path: Some(PathBuf::from("/tmp/prefs.json")) };
        assert_eq!(prefs.resolve_path(), PathBuf::from("/tmp/prefs.json"));
    }
}
