use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qr_sheet_checkin::audit::AuditLog;
use qr_sheet_checkin::config::{Config, Overrides};
use qr_sheet_checkin::models::{Outcome, WorksheetId};
use qr_sheet_checkin::scanner::{ScanEvents, DEFAULT_HOLD};
use qr_sheet_checkin::sheets::{GoogleSheets, Spreadsheet};
use qr_sheet_checkin::{import, pipeline, Error};

#[derive(Parser)]
#[command(name = "qr-checkin")]
#[command(about = "Post QR check-in scans to a Google Sheets worksheet", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "QR_CHECKIN_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, global = true, env = "QR_CHECKIN_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,
    /// Service-account key file
    #[arg(long, global = true, env = "QR_CHECKIN_CREDENTIALS")]
    credentials: Option<PathBuf>,
    #[arg(long, global = true, env = "QR_CHECKIN_AUDIT_LOG")]
    audit_log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read scans line by line from stdin and post each one
    Scan {
        #[arg(long, short)]
        worksheet: Option<String>,
    },
    /// Post a single manually entered string
    Submit {
        #[arg(long, short)]
        worksheet: Option<String>,
        data: String,
    },
    /// Post every row of a CSV file (course_name,student_id,student_name)
    Import {
        #[arg(long, short)]
        worksheet: Option<String>,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the latest audit log entries
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Verify credentials and worksheet access
    Check {
        #[arg(long, short)]
        worksheet: Option<String>,
    },
    /// List the configured worksheets
    Worksheets,
}

fn print_outcome(worksheet: &WorksheetId, outcome: &Outcome) {
    match outcome {
        Outcome::Accepted {
            row,
            row_index,
            log_error,
        } => {
            println!("Data posted to worksheet '{worksheet}':");
            println!("  Column A: {}", row.course_name);
            println!("  Column B: {}", row.student_id);
            println!("  Column C: {}", row.student_name);
            println!("  Column D: {}", row.submitted_at_text());
            println!("  Posted to row {row_index}");
            if let Some(err) = log_error {
                eprintln!("Warning: {err}");
            }
        }
        Outcome::RejectedDuplicate { student_id } => {
            println!(
                "Student {student_id} already exists in worksheet '{worksheet}'. Duplicate entry prevented."
            );
        }
    }
}

fn print_failure(err: &Error) {
    eprintln!("Failed to post data: {err}");
    if err.is_transient() {
        eprintln!("The spreadsheet could not be reached; the scan was not recorded.");
    }
}

async fn run_scan_session(
    sheets: &GoogleSheets,
    audit: &AuditLog,
    worksheet: &WorksheetId,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let stdin = std::io::BufReader::new(std::io::stdin());
    let mut events = ScanEvents::from_reader(stdin, cancel, DEFAULT_HOLD)
        .context("failed to start scanner input")?;
    let mut scan_count = 0usize;

    println!("Scanning into worksheet '{worksheet}'. Press Ctrl-C to stop.");
    while let Some(scan) = events.next_scan().await.context("failed to read scanner input")? {
        scan_count += 1;
        println!("Scan #{scan_count}: {scan}");
        match pipeline::submit(sheets, audit, &scan, worksheet).await {
            Ok(outcome) => print_outcome(worksheet, &outcome),
            Err(err) => print_failure(&err),
        }
    }

    println!("Scan session ended after {scan_count} scans.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qr_sheet_checkin=info,qr_checkin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .apply(Overrides {
            spreadsheet_id: cli.spreadsheet_id,
            credentials: cli.credentials,
            audit_log: cli.audit_log,
        });
    config.validate().context("invalid configuration")?;

    let audit = AuditLog::new(config.audit_log.clone());

    match cli.command {
        Commands::Scan { worksheet } => {
            let worksheet = config.select_worksheet(worksheet.as_deref())?;
            let sheets = GoogleSheets::new(&config)?;
            run_scan_session(&sheets, &audit, &worksheet).await?;
        }
        Commands::Submit { worksheet, data } => {
            let worksheet = config.select_worksheet(worksheet.as_deref())?;
            if data.trim().is_empty() {
                anyhow::bail!("Please enter data first!");
            }
            let sheets = GoogleSheets::new(&config)?;
            match pipeline::submit(&sheets, &audit, data.trim(), &worksheet).await {
                Ok(outcome) => print_outcome(&worksheet, &outcome),
                Err(err) => {
                    print_failure(&err);
                    return Err(err.into());
                }
            }
        }
        Commands::Import { worksheet, csv } => {
            let worksheet = config.select_worksheet(worksheet.as_deref())?;
            let sheets = GoogleSheets::new(&config)?;
            let summary = import::import_csv(&sheets, &audit, &csv, &worksheet).await?;
            println!(
                "Posted {} rows from {} to '{worksheet}' ({} duplicates skipped).",
                summary.accepted,
                csv.display(),
                summary.duplicates
            );
            if summary.log_failures > 0 {
                eprintln!(
                    "Warning: {} rows could not be written to {}.",
                    summary.log_failures,
                    audit.path().display()
                );
            }
        }
        Commands::Recent { limit } => match audit.recent(limit)? {
            None => println!("No log file found"),
            Some(lines) if lines.is_empty() => println!("No recent activity"),
            Some(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
        },
        Commands::Check { worksheet } => {
            let worksheet = config.select_worksheet(worksheet.as_deref())?;
            let sheets = GoogleSheets::new(&config)?;
            match sheets.open_worksheet(&worksheet).await {
                Ok(_) => println!("Connected to Google Sheets (worksheet '{worksheet}')."),
                Err(err) => {
                    eprintln!("Google Sheets connection failed: {err}");
                    return Err(err.into());
                }
            }
        }
        Commands::Worksheets => {
            let set = config.worksheet_set();
            let default = set.default_worksheet();
            for name in set.iter() {
                let marker = if default.as_ref().map(|d| d.as_str()) == Some(name) {
                    " (default)"
                } else {
                    ""
                };
                println!("- {name}{marker}");
            }
        }
    }

    Ok(())
}
