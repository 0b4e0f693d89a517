//! aoike CLI - a static blog framework.

use std::io::IsTerminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod banner;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "aoike")]
#[command(about = "A static blog framework")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server with live reload
    Dev,

    /// Build the blog for production
    Build,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();

    let color = std::io::stdout().is_terminal();

    // Execute command
    match cli.command {
        Commands::Dev => {
            commands::dev::run(color).await?;
        }
        Commands::Build => {
            commands::build::run().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parses_subcommands() {
        Cli::command().debug_assert();

        assert!(matches!(
            Cli::try_parse_from(["aoike", "dev"]).unwrap().command,
            Commands::Dev
        ));
        assert!(matches!(
            Cli::try_parse_from(["aoike", "build"]).unwrap().command,
            Commands::Build
        ));
    }

    #[test]
    fn rejects_unknown_and_missing_commands() {
        assert!(Cli::try_parse_from(["aoike", "deploy"]).is_err());
        assert!(Cli::try_parse_from(["aoike"]).is_err());
    }

    #[test]
    fn reports_version() {
        assert_eq!(Cli::command().get_version(), Some("0.1.0"));
    }
}
