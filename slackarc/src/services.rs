use crate::api::slack::{SlackApi, SlackClient};
use crate::cli::Args;
use crate::collector::Collector;
use crate::context::RunContext;
use crate::models::staged_files;
use crate::settings::{self, RunConfig};

use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::time::Duration;

pub async fn run(args: Args) -> Result<()> {
    let args = settings::merge_settings_with_args(&args)?;
    let config = RunConfig::from_args(&args, Utc::now())?;

    let ctx = match config.timeout {
        Some(timeout) => RunContext::new().with_timeout(timeout),
        None => RunContext::new(),
    };

    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, aborting run");
            token.cancel();
        }
    });

    let client = SlackClient::new(&config.api_url, &config.token)?;
    let mut collector = Collector::new(client, config.collector)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("Archiving channel {}...", config.channel));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = archive(&ctx, &mut collector, &config).await;

    spinner.finish_and_clear();

    if let Err(e) = collector.close() {
        error!("{:#}", e);
    }

    let count = result?;
    info!("archived {} messages from {}", count, config.channel);

    Ok(())
}

/// Collect the channel and hand the result to the formatter and exporter.
///
/// Export runs before the collector goes away since the staged files live in
/// its scratch directory.
pub async fn archive<A: SlackApi>(
    ctx: &RunContext,
    collector: &mut Collector<A>,
    config: &RunConfig,
) -> Result<usize> {
    let nodes = collector
        .execute(ctx, &config.bounds, &config.channel)
        .await?;

    let data = config.formatter.format(&nodes)?;
    config.exporter.write(&data).await?;

    let files = staged_files(&nodes);
    config
        .exporter
        .write_files(&files, &config.formatter)
        .await?;

    Ok(nodes.len())
}
