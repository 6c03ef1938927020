use anyhow::Result;
use clap::Parser;
use render_snapshot::{sink_for, Coordinator, RenderConfig, RunSummary};
use tracing::info;
use wd_session::WebDriverConnector;

use super::env::CliArgs;
use super::runtime::{init_logging, load_config};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting render-snapshot v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_ref()).await?;
    cli.apply_to(&mut config);

    // The error is reported once, by `main`'s return.
    let summary = render(&config).await?;
    info!(
        origin = summary.origin.label(),
        polls = summary.polls.attempts(),
        elapsed = ?summary.polls.elapsed(),
        "Render completed successfully"
    );
    Ok(())
}

async fn render(config: &RenderConfig) -> Result<RunSummary> {
    config.validate()?;
    let target = config.target()?;
    let mode = config.origin_mode()?;
    let connector = WebDriverConnector::new(config.driver_config()?);

    let coordinator = Coordinator::new(connector, config.poll_policy())
        .with_probe_timeout(config.probe_timeout());
    let mut sink = sink_for(config.outfile.as_deref());
    let summary = coordinator.run(&target, &mode, sink.as_mut()).await?;
    Ok(summary)
}
