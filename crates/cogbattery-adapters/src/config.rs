//! Application configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cogbattery_core::config::BatteryConfig;

/// Environment variable overriding the submission endpoint.
pub const ENDPOINT_ENV: &str = "COGBATTERY_ENDPOINT";

/// Top-level cogbattery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Form endpoint receiving results. Nothing is posted when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// JSON file holding the completion locks.
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
    /// Directory for saved result files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Timing and policy of the battery itself.
    #[serde(default)]
    pub battery: BatteryConfig,
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("./cogbattery-locks.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./cogbattery-results")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            lock_path: default_lock_path(),
            output_dir: default_output_dir(),
            battery: BatteryConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `cogbattery.toml` in the current directory
/// 2. `~/.config/cogbattery/config.toml`
///
/// `COGBATTERY_ENDPOINT` overrides the configured endpoint.
pub fn load_config_from(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => search_paths().into_iter().find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AppConfig::default(),
    };

    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        config.endpoint = Some(endpoint);
    }
    config.endpoint = config
        .endpoint
        .as_deref()
        .map(resolve_env_vars)
        .filter(|e| !e.trim().is_empty());

    Ok(config)
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("cogbattery.toml")];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("cogbattery")
                .join("config.toml"),
        );
    }
    paths
}

/// Starter config written by `cogbattery init`.
pub const SAMPLE_CONFIG: &str = r#"# cogbattery configuration

# Form endpoint receiving the results (urlencoded POST).
endpoint = "${COGBATTERY_FORM_URL}"
lock_path = "./cogbattery-locks.json"
output_dir = "./cogbattery-results"

[battery.setup]
# Highest accepted week; 0 accepts any week of 1 or higher.
max_week = 3

[battery.memory]
rounds = 3
study_dwell_ms = 3000
recall_window_ms = 8000
cue_policy = "bidirectional"

[battery.stroop]
phase_secs = 45

[battery.digit_span]
start_length = 3
max_length = 9
trials_per_length = 2
digit_display_ms = 1000
digit_gap_ms = 300
input_timeout_ms = 5000

[battery.reaction]
trials = 20
delay_min_ms = 3000
delay_max_ms = 3500
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use cogbattery_core::config::CuePolicy;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_COGBATTERY_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_COGBATTERY_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("https://${_COGBATTERY_TEST_VAR}/form"),
            "https://hello/form"
        );
        assert_eq!(resolve_env_vars("no vars ${unclosed"), "no vars ${unclosed");
        std::env::remove_var("_COGBATTERY_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.battery.setup.max_week, Some(3));
        assert_eq!(config.output_dir, PathBuf::from("./cogbattery-results"));
    }

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: AppConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("${COGBATTERY_FORM_URL}"));
        assert_eq!(config.battery.memory.cue_policy, CuePolicy::Bidirectional);
        assert_eq!(config.battery.digit_span.digit_gap_ms, 300);
        assert_eq!(config.battery.reaction.trials, 20);
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
lock_path = "/tmp/locks.json"

[battery.setup]
max_week = 0

[battery.memory]
cue_policy = "left_only"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.lock_path, PathBuf::from("/tmp/locks.json"));
        assert_eq!(config.battery.setup.max_week, None);
        assert_eq!(config.battery.memory.cue_policy, CuePolicy::LeftOnly);
        assert_eq!(config.battery.stroop.phase_secs, 45);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/cogbattery.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
