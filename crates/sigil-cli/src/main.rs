//! Sigil command-line tool
//!
//! Embeds schema metadata into declaration sources and inspects or
//! validates data against the resulting schemas.

use clap::{Parser, Subcommand};
use sigil_runtime::SigilConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{emit, inspect, validate};
use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "sigil")]
#[command(about = "Schema metadata toolchain for annotated declaration sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Color output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    /// Configuration file (defaults to the nearest sigil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed metadata payloads into decorator calls
    Emit {
        /// Files or directories to process
        #[arg(default_value = ".")]
        files: Vec<String>,
        /// Write rewritten sources under this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Rewrite sources in place
        #[arg(short, long, conflicts_with = "out_dir")]
        write: bool,
        /// Fail if any source is missing or has stale payloads
        #[arg(long, conflicts_with_all = ["out_dir", "write"])]
        check: bool,
        /// Print emitted records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show models, attributes, actions and persistence declarations
    Inspect {
        /// Files or directories to load
        #[arg(default_value = ".")]
        files: Vec<String>,
        /// Only show this model
        #[arg(short, long)]
        model: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate JSON data against a model schema
    Validate {
        /// Files or directories to load
        #[arg(default_value = ".")]
        files: Vec<String>,
        /// Model to validate against
        #[arg(short, long)]
        model: String,
        /// JSON file holding an object or an array of objects ("-" for stdin)
        #[arg(short, long)]
        data: PathBuf,
        /// Validate as data received from outside (internal attributes are forbidden)
        #[arg(long)]
        external: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    let success = match cli.command {
        Commands::Emit {
            files,
            out_dir,
            write,
            check,
            json,
        } => {
            let options = emit::EmitOptions {
                out_dir,
                write,
                check,
                json,
            };
            emit::execute(&files, &options, &config, &mut out)?
        }

        Commands::Inspect { files, model, json } => {
            inspect::execute(&files, model.as_deref(), json, config, &mut out)?
        }

        Commands::Validate {
            files,
            model,
            data,
            external,
            json,
        } => {
            let options = validate::ValidateOptions {
                model,
                data,
                external,
                json,
            };
            validate::execute(&files, &options, config, &mut out)?
        }
    };

    out.flush();
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// `SIGIL_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("SIGIL_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SigilConfig> {
    if let Some(path) = path {
        let config = SigilConfig::from_file(path)?;
        tracing::info!(config = %path.display(), "loaded configuration");
        return Ok(config);
    }
    let cwd = std::env::current_dir()?;
    Ok(match SigilConfig::discover(&cwd)? {
        Some((path, config)) => {
            tracing::info!(config = %path.display(), "loaded configuration");
            config
        }
        None => SigilConfig::default(),
    })
}
