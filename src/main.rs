//! CLI entry point: bulk-import a CSV file or a Google Sheet tab into
//! HubSpot contacts, companies, or deals.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hublift::config::Config;
use hublift::error::AppError;
use hublift::hubspot::{HubSpotClient, ObjectType};
use hublift::import::{import_rows, source, RawRow, RunSummary};
use hublift::sheets::SheetsClient;

#[derive(Parser)]
#[command(
    name = "hublift",
    about = "Bulk-import CSV or Google Sheets rows into the HubSpot CRM"
)]
struct Cli {
    /// CSV file to import.
    #[arg(long, conflicts_with_all = ["sheet", "tab"])]
    file: Option<PathBuf>,

    /// Google spreadsheet ID to import from (requires GOOGLE_ACCESS_TOKEN).
    #[arg(long, requires = "tab")]
    sheet: Option<String>,

    /// Tab name within the spreadsheet.
    #[arg(long)]
    tab: Option<String>,

    /// Target object: contacts, companies, or deals.
    #[arg(long, default_value = "companies")]
    target: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("hublift=warn")
        }))
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let target: ObjectType = cli.target.parse().map_err(AppError::Internal)?;

    let http = Arc::new(reqwest::Client::new());
    let hubspot = HubSpotClient::new(
        Arc::clone(&http),
        &config.hubspot_base_url,
        config.hubspot_token.clone(),
    )?;
    let creator = Arc::new(hubspot.creator_for(target));

    let rows = load_rows(&cli, &config, &http).await?;
    let total = rows.len();
    eprintln!("importing {} rows into {}", total, target);

    let on_progress = Arc::new(move |summary: &RunSummary| {
        eprint!(
            "\r{}/{} processed ({} failed, {} warned)",
            summary.completed, summary.total, summary.failed, summary.warned
        );
        let _ = std::io::stderr().flush();
    });

    let summary = import_rows(&rows, creator, on_progress).await?;
    eprintln!();

    println!("{}", summary.summary_line());
    for warning in &summary.warnings {
        println!("Row {}: {}", warning.row, warning.message);
    }
    for error in &summary.errors {
        println!("Row {}: {}", error.row, error.message);
    }

    Ok(())
}

/// Reads rows from the selected source.
async fn load_rows(
    cli: &Cli,
    config: &Config,
    http: &Arc<reqwest::Client>,
) -> Result<Vec<RawRow>, AppError> {
    if let Some(file) = &cli.file {
        let text = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| AppError::CsvInvalid(format!("Failed to read {}: {}", file.display(), e)))?;
        return source::parse_csv(&text);
    }

    if let (Some(sheet), Some(tab)) = (&cli.sheet, &cli.tab) {
        let token = config
            .google_token
            .clone()
            .ok_or_else(|| AppError::GoogleApi("GOOGLE_ACCESS_TOKEN is required".to_string()))?;
        let sheets = SheetsClient::new(Arc::clone(http), token);
        return sheets.read_rows(sheet, tab).await;
    }

    Err(AppError::Internal(
        "provide --file <path> or --sheet <id> --tab <name>".to_string(),
    ))
}
