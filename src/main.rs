use anyhow::{Context, Result};
use clap::Parser;
use schemata::cli::commands::apply::{ApplyCommand, ApplyCommandHandler};
use schemata::cli::commands::check::{CheckCommand, CheckCommandHandler};
use schemata::cli::commands::diff::{DiffCommand, DiffCommandHandler};
use schemata::cli::commands::status::{StatusCommand, StatusCommandHandler};
use schemata::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .and_then(|runtime| runtime.block_on(run_command(cli)));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化（RUST_LOGが優先）
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "schemata=debug" } else { "schemata=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    let config_path = cli.config;

    match cli.command {
        Commands::Status {
            app,
            migrations_dir,
            format,
        } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                config_path,
                app,
                migrations_dir,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Apply { file, dry_run } => {
            let handler = ApplyCommandHandler::new();
            let command = ApplyCommand {
                config_path,
                file,
                dry_run,
            };
            handler.execute(&command).await
        }

        Commands::Diff { file, format } => {
            let handler = DiffCommandHandler::new();
            let command = DiffCommand {
                config_path,
                file,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Check { file } => {
            let handler = CheckCommandHandler::new();
            let command = CheckCommand { config_path, file };
            handler.execute(&command).await
        }
    }
}
