pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgGateway};

#[derive(Parser)]
#[command(name = "csvx")]
#[command(about = "CSV Explorer operator CLI - database setup, accounts, ingestion and reports")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create tables and the default administrator")]
    Init,

    #[command(about = "Account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Ingest a CSV file as one batch")]
    Ingest {
        #[arg(help = "Path to the CSV file")]
        file: PathBuf,

        #[arg(long, default_value = "csvx", help = "Name recorded as the uploader")]
        uploaded_by: String,
    },

    #[command(about = "Write the PDF report for an organization")]
    Report {
        #[arg(help = "Output PDF path")]
        output: PathBuf,

        #[arg(long, short, help = "Organization to report on (default: All)")]
        organization: Option<String>,

        #[arg(long, value_delimiter = ',', help = "Columns to include, comma-separated")]
        columns: Option<Vec<String>>,
    },

    #[command(about = "List organizations with row counts")]
    Organizations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Gateway for one CLI invocation. The database must be reachable.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgGateway> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("could not connect to the database (set DATABASE_URL or PG* variables)")?;
    Ok(PgGateway::new(pool))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config();

    match cli.command {
        Commands::Init => commands::init::handle(config, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, config, output_format).await,
        Commands::Ingest { file, uploaded_by } => {
            commands::data::ingest(config, &file, uploaded_by, output_format).await
        }
        Commands::Report {
            output,
            organization,
            columns,
        } => commands::report::handle(config, &output, organization, columns, output_format).await,
        Commands::Organizations => commands::data::organizations(config, output_format).await,
    }
}
