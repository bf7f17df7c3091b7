// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// Schemata - Database schema migration and diffing engine
#[derive(Parser, Debug)]
#[command(name = "schemata")]
#[command(author = "Schemata Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Database schema migration and diffing engine")]
#[command(long_about = "Schemata - Database schema migration and diffing engine

Applies legacy XML schema files to a live database, reports the
migration ledger, and checks identifiers against platform limits.

Supported databases: MySQL, PostgreSQL, SQLite (Oracle: validation and SQL only)")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (default: ./.schemata.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show recorded migration versions
    ///
    /// EXAMPLES:
    ///   schemata status
    ///   schemata status --app files_sharing
    Status {
        /// Migration namespace (default: `app` from the config file)
        #[arg(short, long, value_name = "APP")]
        app: Option<String>,

        /// Directory containing `Version<N>Date<YYYYMMDDHHMMSS>` files
        #[arg(short, long, value_name = "DIR")]
        migrations_dir: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create or update the database from an XML schema file
    ///
    /// EXAMPLES:
    ///   schemata apply db_structure.xml
    ///   schemata apply db_structure.xml --dry-run
    Apply {
        /// XML schema file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dry run - show SQL without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the changes an XML schema file would make
    ///
    /// EXAMPLES:
    ///   schemata diff db_structure.xml
    ///   schemata diff db_structure.xml --format json
    Diff {
        /// XML schema file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check an XML schema file against platform naming constraints
    ///
    /// EXAMPLES:
    ///   schemata check db_structure.xml
    Check {
        /// XML schema file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}
