// Parse command - one-shot import of everything under the given paths

use anyhow::Result;
use std::sync::Arc;

use super::{CommandContext, ExitStatus};
use crate::cli::args::ParseArgs;
use crate::pipeline::ReportPipeline;
use crate::watcher::PathRules;

pub async fn handle_parse(args: &ParseArgs, ctx: &CommandContext) -> Result<ExitStatus> {
    let mut params = ctx.parameters(args.report_type);
    params.verbose = args.verbose_report;
    params.parse_out_of_date = true;
    params.limits = args.limits.limits();

    let rules = Arc::new(PathRules::parse(&args.rule_body(), &ctx.base_dir));

    // Stopping right away still runs the watcher's final scan
    let pipeline = ReportPipeline::start(params, rules, ctx.sinks.clone(), ctx.settings);
    let outcome = pipeline.finish().await?;

    Ok(ctx.summarize(&[outcome]))
}
