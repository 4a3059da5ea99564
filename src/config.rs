// Configuration file handling

use crate::parser::ReportType;
use crate::state::Limits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    /// Prefix stripped from source paths in inspection reports
    #[serde(default)]
    pub checkout_dir: Option<String>,

    /// FindBugs installation providing the bug-pattern catalog
    #[serde(default)]
    pub findbugs_home: Option<String>,

    /// Output format (console, json)
    #[serde(default)]
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// How long the processor waits for a new file while the watcher runs
    #[serde(default = "default_file_wait_timeout_ms")]
    pub file_wait_timeout_ms: u64,

    /// How long the processor waits for a new file while draining
    #[serde(default = "default_drain_wait_timeout_ms")]
    pub drain_wait_timeout_ms: u64,

    /// Pause between attempts on an incomplete report
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Attempts before an incomplete report is given up
    #[serde(default = "default_tries_to_parse")]
    pub tries_to_parse: u32,

    /// Pause between directory scans
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            file_wait_timeout_ms: default_file_wait_timeout_ms(),
            drain_wait_timeout_ms: default_drain_wait_timeout_ms(),
            scan_interval_ms: default_scan_interval_ms(),
            tries_to_parse: default_tries_to_parse(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

// Default values
pub const ENV_XMLREPORT_CHECKOUT_DIR: &str = "XMLREPORT_CHECKOUT_DIR";

pub fn default_file_wait_timeout_ms() -> u64 {
    500
}

pub fn default_drain_wait_timeout_ms() -> u64 {
    1
}

pub fn default_scan_interval_ms() -> u64 {
    100
}

pub fn default_tries_to_parse() -> u32 {
    100
}

pub fn default_watch_interval_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. .xmlreportrc (current directory)
        // 2. ~/.xmlreportrc (home directory)
        // 3. .xmlreportrc.toml (current directory)
        // 4. ~/.xmlreportrc.toml (home directory)

        let cwd = std::env::current_dir().ok()?;
        let home = dirs::home_dir()?;

        let paths = [
            cwd.join(".xmlreportrc"),
            home.join(".xmlreportrc"),
            cwd.join(".xmlreportrc.toml"),
            home.join(".xmlreportrc.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        None
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Option<Self> {
        toml::from_str(content).ok()
    }

    /// Generate default configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    pub fn processing_settings(&self) -> ProcessingSettings {
        ProcessingSettings::from(&self.processing)
    }
}

/// Timing constants of the processor and the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSettings {
    pub file_wait_timeout: Duration,
    pub drain_wait_timeout: Duration,
    pub scan_interval: Duration,
    pub tries_to_parse: u32,
    pub watch_interval: Duration,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for ProcessingSettings {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            file_wait_timeout: Duration::from_millis(config.file_wait_timeout_ms),
            drain_wait_timeout: Duration::from_millis(config.drain_wait_timeout_ms),
            scan_interval: Duration::from_millis(config.scan_interval_ms),
            tries_to_parse: config.tries_to_parse.max(1),
            watch_interval: Duration::from_millis(config.watch_interval_ms),
        }
    }
}

/// Parameters of one import directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportParameters {
    pub report_type: ReportType,
    pub verbose: bool,
    pub parse_out_of_date: bool,
    pub limits: Limits,
    pub findbugs_home: Option<PathBuf>,
    pub checkout_dir: String,
    /// Files modified before this instant are out of date
    pub build_start: DateTime<Utc>,
}

impl ReportParameters {
    pub fn new(report_type: ReportType) -> Self {
        Self {
            report_type,
            verbose: false,
            parse_out_of_date: false,
            limits: Limits::default(),
            findbugs_home: None,
            checkout_dir: String::new(),
            build_start: Utc::now(),
        }
    }

    /// Fill in whatever the directive left open from the configuration file
    pub fn with_config(mut self, config: &Config) -> Self {
        if self.checkout_dir.is_empty()
            && let Some(dir) = &config.general.checkout_dir
        {
            self.checkout_dir = dir.clone();
        }
        if self.findbugs_home.is_none() {
            self.findbugs_home = config.general.findbugs_home.as_ref().map(PathBuf::from);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[general]
checkout_dir = "/work/checkout"
findbugs_home = "/opt/findbugs"
log_format = "json"

[processing]
file_wait_timeout_ms = 50
tries_to_parse = 3
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        assert_eq!(config.general.checkout_dir.as_deref(), Some("/work/checkout"));
        assert_eq!(config.general.log_format.as_deref(), Some("json"));
        assert_eq!(config.processing.file_wait_timeout_ms, 50);
        assert_eq!(config.processing.tries_to_parse, 3);
        assert_eq!(config.processing.scan_interval_ms, 100);

        let settings = config.processing_settings();
        assert_eq!(settings.file_wait_timeout, Duration::from_millis(50));
        assert_eq!(settings.drain_wait_timeout, Duration::from_millis(1));
    }

    #[test]
    fn test_parameters_take_config_fallbacks() {
        let config = Config::parse("[general]\ncheckout_dir = \"/ws\"\nfindbugs_home = \"/fb\"").unwrap();

        let params = ReportParameters::new(ReportType::FindBugs).with_config(&config);
        assert_eq!(params.checkout_dir, "/ws");
        assert_eq!(params.findbugs_home, Some(PathBuf::from("/fb")));

        let mut explicit = ReportParameters::new(ReportType::FindBugs);
        explicit.checkout_dir = "/mine".to_string();
        assert_eq!(explicit.with_config(&config).checkout_dir, "/mine");
    }

    #[test]
    fn test_zero_tries_clamped() {
        let config = Config::parse("[processing]\ntries_to_parse = 0").unwrap();
        assert_eq!(config.processing_settings().tries_to_parse, 1);
    }
}
