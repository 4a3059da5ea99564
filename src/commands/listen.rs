// Listen command - start one pipeline per import directive read from stdin

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{CommandContext, ExitStatus};
use crate::cli::args::ListenArgs;
use crate::pipeline::ReportPipeline;
use crate::trigger::ImportDirective;
use crate::watcher::PathRules;

pub async fn handle_listen(args: &ListenArgs, ctx: &CommandContext) -> Result<ExitStatus> {
    let base_dir = args.base_dir.clone().unwrap_or_else(|| ctx.base_dir.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pipelines = Vec::new();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let directive = match ImportDirective::parse_line(&line) {
            Ok(Some(directive)) => directive,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping directive: {}", e);
                ctx.sinks.log.warning(&e.to_string());
                continue;
            }
        };

        debug!("Directive: {:?}", directive);
        let mut params = directive.to_parameters();
        params.checkout_dir = ctx.checkout_dir.clone();
        if params.findbugs_home.is_none() {
            params.findbugs_home = ctx.findbugs_home.clone();
        }

        let rules = Arc::new(PathRules::parse(&directive.path, &base_dir));
        pipelines.push(ReportPipeline::start(
            params,
            rules,
            ctx.sinks.clone(),
            ctx.settings,
        ));
    }

    debug!("Input closed, finishing {} pipeline(s)", pipelines.len());
    let mut outcomes = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        outcomes.push(pipeline.finish().await?);
    }

    Ok(ctx.summarize(&outcomes))
}
