//! Command-line interface
//! - analysis.rs: meta/impostor/transitive classification
//! - report.rs: plain-text report
//! - commands.rs: subcommand handlers
//! - logging.rs: tracing setup

pub mod analysis;
pub mod commands;
pub mod logging;
pub mod report;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{self, AppConfig};

#[derive(Parser)]
#[command(name = "nuget-depcheck")]
#[command(version, about = "Finds redundant NuGet package references")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/nuget-depcheck/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for cached registry responses
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// NuGet v3 service index URL
    #[arg(long, global = true)]
    pub service_index: Option<String>,

    /// Lifetime of cached responses in hours
    #[arg(long, global = true)]
    pub ttl_hours: Option<u64>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Classify the package references of a project
    Analyze(AnalyzeArgs),

    /// Lowest version compatible with two version ranges
    CommonVersion { first: String, second: String },

    /// Set or remove the version of one package reference
    SetVersion {
        project: PathBuf,
        package: String,
        /// Omit to remove the attribute
        version: Option<String>,
        /// Edit VersionOverride instead of Version
        #[arg(long = "override")]
        version_override: bool,
    },

    /// Inspect or prune the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Project file (.csproj)
    pub project: PathBuf,

    /// Concurrent registry lookups
    #[arg(long)]
    pub workers: Option<usize>,

    /// Target framework fragment selecting the dependency group (repeatable)
    #[arg(long = "framework")]
    pub frameworks: Vec<String>,

    /// Remove impostor references from the project file
    #[arg(long)]
    pub remove_impostors: bool,
}

#[derive(Subcommand, Clone, Copy)]
pub enum CacheAction {
    /// List cached entries
    List,
    /// Delete expired entries
    Prune,
    /// Delete every entry
    Clear,
}

/// Effective settings after merging the config file and flags
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub service_index_url: String,
    pub fetch_timeout: Duration,
    pub workers: usize,
    pub target_frameworks: Vec<String>,
}

impl Settings {
    pub fn resolve(cli: &Cli, app_config: AppConfig) -> Self {
        let analyze = match &cli.command {
            Command::Analyze(args) => Some(args),
            _ => None,
        };

        let workers = analyze
            .and_then(|args| args.workers)
            .or(app_config.analysis.workers)
            .unwrap_or_else(config::default_workers)
            .max(1);

        let target_frameworks = match analyze {
            Some(args) if !args.frameworks.is_empty() => args.frameworks.clone(),
            _ => app_config.analysis.target_frameworks,
        };

        let cache_ttl = cli
            .ttl_hours
            .map(|hours| Duration::from_secs(hours.saturating_mul(60 * 60)))
            .unwrap_or(Duration::from_secs(app_config.cache.ttl_secs));

        Self {
            cache_dir: cli
                .cache_dir
                .clone()
                .or(app_config.cache.dir)
                .unwrap_or_else(config::cache_dir),
            cache_ttl,
            service_index_url: cli
                .service_index
                .clone()
                .unwrap_or(app_config.registry.service_index_url),
            fetch_timeout: Duration::from_secs(app_config.registry.timeout_secs),
            workers,
            target_frameworks,
        }
    }
}

/// Runs one subcommand, printing its output to stdout
pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let output = match command {
        Command::Analyze(args) => commands::analyze(&settings, &args).await?,
        Command::CommonVersion { first, second } => commands::common_version(&first, &second)?,
        Command::SetVersion {
            project,
            package,
            version,
            version_override,
        } => commands::set_version(&project, &package, version.as_deref(), version_override)?,
        Command::Cache { action } => commands::cache(&settings, action)?,
    };
    print!("{}", output);
    Ok(())
}
