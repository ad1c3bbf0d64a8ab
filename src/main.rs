use anyhow::Context;
use clap::Parser;

use nuget_depcheck::cli::{self, Cli, Settings, logging};
use nuget_depcheck::config::{self, AppConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&config::log_path(), cli.verbose)?;

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let app_config = AppConfig::load(&config_path)?;
    let settings = Settings::resolve(&cli, app_config);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers)
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(cli::run(cli.command, settings))
}
