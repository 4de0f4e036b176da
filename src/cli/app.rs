//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::serve;
use crate::config::Config;
use crate::plugin::PluginManifest;

#[derive(Parser)]
#[command(name = "plugin-bridge")]
#[command(author, version, about = "Plugin side of an editor host sync protocol")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true, env = "PLUGIN_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Talk to the host over stdin/stdout (default)
    Serve {
        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Default log filter, e.g. `debug` or `plugin_bridge=trace`
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Show the methods this plugin speaks
    Manifest,

    /// Show the effective configuration
    Config,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    output.verbose_ctx(
        "config",
        &format!(
            "Loaded config from {}",
            cli.config
                .clone()
                .or_else(Config::default_path)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<defaults>".to_string())
        ),
    );

    let command = cli.command.unwrap_or(Commands::Serve {
        log_file: None,
        log_level: None,
    });

    match command {
        Commands::Serve {
            log_file,
            log_level,
        } => {
            if let Some(file) = log_file {
                config.log.file = Some(file);
            }
            if let Some(level) = log_level {
                config.log.level = level;
            }
            serve::run(&config, &output)?;
        }

        Commands::Manifest => manifest(&output),

        Commands::Config => {
            if output.is_json() {
                output.data(&config);
            } else {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}

fn manifest(output: &Output) {
    let manifest = PluginManifest::current();

    if output.is_json() {
        output.data(&manifest);
        return;
    }

    output.row(&[&manifest.name, &manifest.version]);
    output.row(&[&manifest.description]);
    output.row(&["inbound:", &manifest.inbound.join(", ")]);
    output.row(&["outbound:", &manifest.outbound.join(", ")]);
}
