pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod report;
pub mod state;
pub mod trigger;
pub mod utils;
pub mod watcher;

pub use error::{ConfigError, ReportError};
pub use parser::{FormatParser, ParseOutcome, ReportParser, ReportType};
pub use pipeline::{PipelineOutcome, ReportPipeline};
pub use processor::{ProcessorReport, ReportProcessor};
