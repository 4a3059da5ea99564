// Watch command - import reports while they are being written

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{CommandContext, ExitStatus};
use crate::cli::args::WatchArgs;
use crate::pipeline::ReportPipeline;
use crate::watcher::PathRules;

pub async fn handle_watch(args: &WatchArgs, ctx: &CommandContext) -> Result<ExitStatus> {
    let mut params = ctx.parameters(args.report_type);
    params.verbose = args.verbose_report;
    params.parse_out_of_date = args.parse_out_of_date;
    params.limits = args.limits.limits();

    let rules = Arc::new(PathRules::parse(&args.rule_body(), &ctx.base_dir));
    let pipeline = ReportPipeline::start(params, rules, ctx.sinks.clone(), ctx.settings);

    match args.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!("Watch duration of {}s elapsed", secs);
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl-C")?;
                    info!("Interrupted, finishing import");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("Interrupted, finishing import");
        }
    }

    let outcome = pipeline.finish().await?;
    Ok(ctx.summarize(&[outcome]))
}
