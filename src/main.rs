//! dataprep - Main Entry Point
//!
//! Interactive data cleaning when run without arguments, otherwise one of
//! the `clean`, `info` or `convert` commands.

use clap::Parser;
use dataprep::cli::{cmd_clean, cmd_convert, cmd_info, cmd_interactive, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataprep=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Clean(args)) => {
            cmd_clean(&args)?;
        }
        Some(Commands::Info { input, source }) => {
            cmd_info(&input, &source)?;
        }
        Some(Commands::Convert { input, format, output, source }) => {
            cmd_convert(&input, &format, &output, &source)?;
        }
        None => {
            cmd_interactive()?;
        }
    }

    Ok(())
}
