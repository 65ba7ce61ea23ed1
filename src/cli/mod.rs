pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Report Runner - runs a batch of analytical queries and saves dated reports
#[derive(Parser, Debug)]
#[command(
    name = "report-runner",
    version,
    about = "Report Runner - runs a batch of analytical queries and saves dated reports"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every configured report once
    Run {
        /// Print the batch result as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero if any report was not saved
        #[arg(long)]
        strict: bool,
    },

    /// Serve the HTTP trigger endpoint
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short = 'p', long)]
        port: Option<u16>,
    },

    /// List configured reports
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Dispatch the CLI command to the appropriate handler.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Some(Commands::Run { json, strict }) => {
            commands::cmd_run(config_path, *json, *strict).await
        }
        Some(Commands::Serve { host, port }) => {
            commands::cmd_serve(config_path, host.as_deref(), *port).await
        }
        Some(Commands::List { json }) => commands::cmd_list(config_path, *json),
        None => {
            // No subcommand provided -- print help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version_flag() {
        let err = Cli::try_parse_from(["report-runner", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains("0.1.0"));
    }

    #[test]
    fn test_cli_parse_run_flags() {
        let cli = Cli::try_parse_from(["report-runner", "run", "--json", "--strict"]).unwrap();
        match cli.command {
            Some(Commands::Run { json, strict }) => {
                assert!(json);
                assert!(strict);
            }
            other => panic!("Expected Run, got: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["report-runner", "list", "--config", "/etc/reports.json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/reports.json")));
        assert!(matches!(cli.command, Some(Commands::List { json: false })));
    }

    #[test]
    fn test_cli_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "report-runner",
            "-v",
            "serve",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("Expected Serve, got: {:?}", other),
        }
    }

    #[test]
    fn test_cli_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["report-runner", "schedule"]).is_err());
    }
}
