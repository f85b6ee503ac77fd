//! Reflekt command-line tool
//!
//! Lists the types a namespace scan would find and prints the effective
//! configuration. Log output goes to stderr and is filtered by `REFLEKT_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "reflekt")]
#[command(about = "Reflective access and namespace scanning toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./reflekt.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the types under a namespace
    Scan {
        /// Dotted namespace, e.g. "com.acme.model"
        namespace: String,
        /// Extra class-path directory (repeatable)
        #[arg(long = "classpath", value_name = "DIR")]
        classpath: Vec<PathBuf>,
        /// Archive to scan when no directory yields units
        #[arg(long, value_name = "FILE")]
        archive: Option<PathBuf>,
        /// Compiled-unit extension
        #[arg(long, value_name = "EXT")]
        extension: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("REFLEKT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            namespace,
            classpath,
            archive,
            extension,
        } => commands::scan::execute(commands::scan::ScanArgs {
            config: cli.config,
            namespace,
            classpath,
            archive,
            extension,
        }),

        Commands::Config => commands::config::execute(cli.config.as_deref()),
    }
}
