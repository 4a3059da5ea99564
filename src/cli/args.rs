// CLI argument definitions using Clap

use crate::parser::ReportType;
use crate::state::Limits;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sink used for report output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Json,
}

/// Incremental importer for XML build reports
#[derive(Parser, Debug)]
#[command(name = "xmlreport")]
#[command(author = "xmlreport contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Import test results, inspections and duplicates from XML build reports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Report output format (console, json)
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Prefix stripped from source paths inside inspection reports
    #[arg(long, global = true, value_name = "DIR")]
    pub checkout_dir: Option<String>,

    /// FindBugs installation with etc/findbugs.xml and etc/messages.xml
    #[arg(long, global = true, value_name = "DIR")]
    pub findbugs_home: Option<PathBuf>,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Install shell completion (bash, zsh, fish, elvish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "elvish", "powershell"])]
    pub completion: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every report under the given paths once
    Parse(ParseArgs),

    /// Watch the given paths and import reports as they appear
    Watch(WatchArgs),

    /// Read import directives from stdin
    Listen(ListenArgs),

    /// List supported report types
    Types(TypesArgs),
}

/// Error and warning limits shared by the import commands
#[derive(Args, Debug, Clone, Default)]
pub struct LimitArgs {
    /// Fail the build when more errors are found
    #[arg(long, value_name = "N")]
    pub error_limit: Option<u32>,

    /// Fail the build when more warnings are found
    #[arg(long, value_name = "N")]
    pub warning_limit: Option<u32>,
}

impl LimitArgs {
    pub fn limits(&self) -> Limits {
        Limits {
            max_errors: self.error_limit,
            max_warnings: self.warning_limit,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Report type (see `xmlreport types`)
    #[arg(short = 't', long = "type", value_parser = parse_report_type)]
    pub report_type: ReportType,

    /// Print a summary line for every processed report
    #[arg(long, default_value_t = false)]
    pub verbose_report: bool,

    #[command(flatten)]
    pub limits: LimitArgs,

    /// Paths skipped even when inside an included directory
    #[arg(short = 'x', long = "exclude", value_name = "PATH")]
    pub excludes: Vec<String>,

    /// Report files or directories
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Report type (see `xmlreport types`)
    #[arg(short = 't', long = "type", value_parser = parse_report_type)]
    pub report_type: ReportType,

    /// Also import files modified before the watch started
    #[arg(long, default_value_t = false)]
    pub parse_out_of_date: bool,

    /// Print a summary line for every processed report
    #[arg(long, default_value_t = false)]
    pub verbose_report: bool,

    #[command(flatten)]
    pub limits: LimitArgs,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short = 'd', long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Paths skipped even when inside an included directory
    #[arg(short = 'x', long = "exclude", value_name = "PATH")]
    pub excludes: Vec<String>,

    /// Report files or directories
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Directory that relative directive paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TypesArgs {
    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

fn parse_report_type(value: &str) -> Result<ReportType, String> {
    value.parse::<ReportType>().map_err(|e| e.to_string())
}

impl Cli {
    /// Effective output format; the CLI flag wins over the configuration file
    pub fn log_format_mode(&self, configured: Option<&str>) -> LogFormat {
        match self.log_format.as_deref().or(configured) {
            Some(format) if is_json_format(format) => LogFormat::Json,
            _ => LogFormat::Console,
        }
    }
}

fn is_json_format(value: &str) -> bool {
    value.eq_ignore_ascii_case("json")
}

/// Rule body in `+:`/`-:` form
pub fn rule_body(paths: &[String], excludes: &[String]) -> String {
    paths
        .iter()
        .map(|p| format!("+:{}", p))
        .chain(excludes.iter().map(|p| format!("-:{}", p)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ParseArgs {
    pub fn rule_body(&self) -> String {
        rule_body(&self.paths, &self.excludes)
    }
}

impl WatchArgs {
    pub fn rule_body(&self) -> String {
        rule_body(&self.paths, &self.excludes)
    }
}

impl TypesArgs {
    pub fn is_json(&self) -> bool {
        is_json_format(&self.format)
    }
}
