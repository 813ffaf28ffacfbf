// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use snowsaw::{
    bootstrap, discover,
    path::{default_settings_paths, expand},
    Registry, Settings, Snowblock,
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit, str::FromStr};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "snowsaw [options] <snowsaw-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print debug messages.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Alias of --verbose.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Only print errors.
    #[arg(short = 'Q', long, global = true)]
    pub super_quiet: bool,

    /// Use settings file instead of searching default locations.
    #[arg(long, global = true, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Comma-separated snowblock base directories.
    #[arg(short, long, global = true, value_delimiter = ',', value_name = "dirs")]
    pub basedirs: Vec<String>,

    /// Run without the built-in link, clean, and shell handlers.
    #[arg(long, global = true)]
    pub disable_core_directives: bool,
}

impl Cli {
    fn level(&self, settings: &Settings) -> LevelFilter {
        if self.verbose || self.debug {
            LevelFilter::DEBUG
        } else if self.quiet {
            LevelFilter::WARN
        } else if self.super_quiet {
            LevelFilter::ERROR
        } else {
            LevelFilter::from_str(settings.log_level()).unwrap_or(LevelFilter::INFO)
        }
    }

    fn registry(&self) -> Registry {
        if self.disable_core_directives {
            Registry::empty()
        } else {
            Registry::core()
        }
    }

    fn run(self, settings: Settings) -> Result<()> {
        let registry = self.registry();
        match self.command {
            Command::Bootstrap(ref opts) => run_bootstrap(opts, &self.basedirs, &settings, &registry),
            Command::Info => run_info(&settings, &registry),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Bootstrap snowblocks.
    #[command(override_usage = "snowsaw bootstrap [options] [<snowblock>]...")]
    Bootstrap(BootstrapOptions),

    /// Show effective settings and available directive handlers.
    #[command(override_usage = "snowsaw info [options]")]
    Info,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BootstrapOptions {
    /// Paths to snowblocks to bootstrap instead of discovering them.
    #[arg(value_name = "snowblock")]
    pub snowblocks: Vec<String>,

    /// Bootstrap the snowblock of a single configuration file.
    #[arg(short = 'c', long, value_name = "file", conflicts_with = "snowblocks")]
    pub config_file: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // INVARIANT: Settings pick the log level, so load them before the subscriber.
    let settings = load_settings(&cli);
    let level = match &settings {
        Ok(settings) => cli.level(settings),
        Err(_) => cli.level(&Settings::default()),
    };

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    let result = settings.and_then(|settings| cli.run(settings));
    if let Err(error) = result {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("settings file {} does not exist", path.display());
            }
            Settings::load([path])?
        }
        None => Settings::load(default_settings_paths())?,
    };

    Ok(settings)
}

fn run_bootstrap(
    opts: &BootstrapOptions,
    basedirs: &[String],
    settings: &Settings,
    registry: &Registry,
) -> Result<()> {
    let snowblocks = if let Some(config_file) = &opts.config_file {
        vec![Snowblock::from_config_file(expand(config_file)?)]
    } else if !opts.snowblocks.is_empty() {
        opts.snowblocks
            .iter()
            .map(|path| -> Result<Snowblock> { Ok(Snowblock::explicit(expand(path)?)) })
            .collect::<Result<Vec<_>>>()?
    } else {
        let base_dirs = if basedirs.is_empty() {
            settings.base_dirs()
        } else {
            basedirs.iter().map(PathBuf::from).collect()
        };
        let mut snowblocks = discover(base_dirs)?;
        if let Some(paths) = &settings.snowblocks.paths {
            snowblocks.extend(paths.iter().cloned().map(Snowblock::explicit));
        }
        snowblocks
    };

    if snowblocks.is_empty() {
        warn!("no snowblocks found");
        return Ok(());
    }

    let summary = bootstrap(&snowblocks, registry);
    info!(
        "{} succeeded, {} failed, {} skipped",
        summary.succeeded.len(),
        summary.failed.len(),
        summary.skipped.len()
    );

    if !summary.is_success() {
        bail!("failed to bootstrap {}", summary.failed.join(", "));
    }

    Ok(())
}

fn run_info(settings: &Settings, registry: &Registry) -> Result<()> {
    println!("{settings}");
    println!("directives = {:?}", registry.names());

    Ok(())
}
