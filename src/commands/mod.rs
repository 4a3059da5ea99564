// Commands module - handles CLI command execution

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod listen;
pub mod parse;
pub mod types;
pub mod watch;

pub use listen::handle_listen;
pub use parse::handle_parse;
pub use types::handle_types;
pub use watch::handle_watch;

use crate::cli::{Cli, LogFormat};
use crate::config::{Config, ENV_XMLREPORT_CHECKOUT_DIR, ProcessingSettings, ReportParameters};
use crate::parser::ReportType;
use crate::pipeline::PipelineOutcome;
use crate::report::{ConsoleSink, Sinks, StreamingJsonSink};

/// Whether the run should make the process fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    ThresholdExceeded,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ThresholdExceeded => 1,
        }
    }

    fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a PipelineOutcome>) -> Self {
        if outcomes.into_iter().any(PipelineOutcome::is_failure) {
            Self::ThresholdExceeded
        } else {
            Self::Success
        }
    }
}

/// Everything an import command needs besides its own arguments
pub struct CommandContext {
    pub settings: ProcessingSettings,
    pub sinks: Sinks,
    pub format: LogFormat,
    pub checkout_dir: String,
    pub findbugs_home: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl CommandContext {
    /// Resolve CLI flags, environment and configuration file, in that order
    pub fn new(cli: &Cli, config: &Config) -> Result<Self> {
        let base_dir = std::env::current_dir()?;
        let format = cli.log_format_mode(config.general.log_format.as_deref());

        let checkout_dir = cli
            .checkout_dir
            .clone()
            .or_else(|| std::env::var(ENV_XMLREPORT_CHECKOUT_DIR).ok())
            .or_else(|| config.general.checkout_dir.clone())
            .unwrap_or_else(|| base_dir.display().to_string());

        let findbugs_home = cli
            .findbugs_home
            .clone()
            .or_else(|| config.general.findbugs_home.as_ref().map(PathBuf::from));

        Ok(Self {
            settings: config.processing_settings(),
            sinks: make_sinks(format),
            format,
            checkout_dir,
            findbugs_home,
            base_dir,
        })
    }

    pub fn parameters(&self, report_type: ReportType) -> ReportParameters {
        let mut params = ReportParameters::new(report_type);
        params.checkout_dir = self.checkout_dir.clone();
        params.findbugs_home = self.findbugs_home.clone();
        params
    }

    /// Print the end-of-run summary and fold the outcomes into an exit status
    pub fn summarize(&self, outcomes: &[PipelineOutcome]) -> ExitStatus {
        let completed: usize = outcomes.iter().map(|o| o.report.completed.len()).sum();
        let failed: usize = outcomes.iter().map(|o| o.report.failed.len()).sum();

        match self.format {
            LogFormat::Console => {
                println!();
                println!("Reports processed: {}, failed: {}", completed, failed);
                for failure in outcomes.iter().flat_map(|o| &o.report.failed) {
                    println!(
                        "  ✗ {} ({:?} after {} attempt(s))",
                        failure.path.display(),
                        failure.kind,
                        failure.tries
                    );
                }
            }
            LogFormat::Json => {
                let failures: Vec<_> = outcomes.iter().flat_map(|o| &o.report.failed).collect();
                let summary = serde_json::json!({
                    "event": "summary",
                    "completed": completed,
                    "failed": failures,
                    "thresholdExceeded": outcomes.iter().any(PipelineOutcome::is_failure),
                });
                println!("{}", summary);
            }
        }

        ExitStatus::from_outcomes(outcomes)
    }
}

fn make_sinks(format: LogFormat) -> Sinks {
    match format {
        LogFormat::Console => Sinks::shared(Arc::new(ConsoleSink::new())),
        LogFormat::Json => Sinks::shared(Arc::new(StreamingJsonSink::new())),
    }
}

/// Dump the effective configuration for `--config`
pub fn handle_show_config(cli: &Cli, config: Option<&Config>) -> Result<()> {
    println!("Current configuration:");
    println!("\n  Command-line arguments:");
    if let Some(dir) = &cli.checkout_dir {
        println!("    Checkout dir: {}", dir);
    }
    if let Some(home) = &cli.findbugs_home {
        println!("    FindBugs home: {}", home.display());
    }
    if let Some(format) = &cli.log_format {
        println!("    Log format: {}", format);
    }

    match config {
        Some(cfg) => {
            println!("\n  Configuration file loaded:");
            print!("{}", indent(&cfg.to_toml()));
        }
        None => {
            println!("\n  No configuration file loaded");
            println!("  Create one with: xmlreport --init-config .xmlreportrc.toml");
            println!("\n  Built-in defaults:");
            print!("{}", indent(&Config::default().to_toml()));
        }
    }

    println!("\n  Environment variables:");
    match std::env::var(ENV_XMLREPORT_CHECKOUT_DIR) {
        Ok(dir) => println!("    {}: {}", ENV_XMLREPORT_CHECKOUT_DIR, dir),
        Err(_) => println!("    {}: not set", ENV_XMLREPORT_CHECKOUT_DIR),
    }

    print_precedence();
    Ok(())
}

/// Write the default configuration for `--init-config`
pub fn handle_init_config(path: &Path) -> Result<()> {
    std::fs::write(path, Config::default().to_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());
    println!("\nYou can now edit the file to customize your settings.");
    print_precedence();
    Ok(())
}

fn print_precedence() {
    println!("\nConfiguration precedence:");
    println!("  1. Command-line arguments (highest)");
    println!("  2. Environment variables");
    println!("  3. Configuration file");
    println!("  4. Built-in defaults (lowest)");
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("    {}\n", l)).collect()
}
