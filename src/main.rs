use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod aggregate;
mod chart;
mod error;
mod intake;
mod markup;
mod models;
mod pdf;
mod report;
mod timestamp;

use models::{DEFAULT_AUTHOR, REPORT_FILE_NAME, REPORT_MIME_TYPE};

#[derive(Parser)]
#[command(name = "enrollment-report")]
#[command(about = "Course enrollment report generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the PDF enrollment report from a CSV or spreadsheet export
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = DEFAULT_AUTHOR)]
        author: String,
        #[arg(long, default_value = REPORT_FILE_NAME)]
        out: PathBuf,
    },
    /// Show the first rows of the enrollment export
    Preview {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Show general enrollment statistics
    Stats {
        #[arg(long)]
        input: PathBuf,
        /// Print the full per-course summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report { input, author, out } => {
            let records = intake::read_path(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            info!("loaded {} rows from {}", records.len(), input.display());

            let bytes = report::build_report(&records, &author, &report::ReportStyle::default())
                .context("failed to generate the report")?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Report written to {} ({}, {} bytes).",
                out.display(),
                REPORT_MIME_TYPE,
                bytes.len()
            );
        }
        Commands::Preview { input, rows } => {
            let records = intake::read_path(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            if records.is_empty() {
                println!("No rows found in {}.", input.display());
                return Ok(());
            }

            println!("Showing {} of {} rows:", rows.min(records.len()), records.len());
            for record in records.iter().take(rows) {
                let start = match &record.start_time {
                    models::StartTime::Parsed(dt) => timestamp::format_display(dt),
                    models::StartTime::Text(raw) => raw.clone(),
                };
                println!(
                    "- {} <{}> | {} | {}",
                    record.full_name, record.contact_email, record.course_name, start
                );
            }
        }
        Commands::Stats { input, json } => {
            let records = intake::read_path(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let summary = aggregate::summarize(&records)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("Total enrollees: {}", summary.total_unique_enrollees);
            println!("Total courses: {}", summary.total_courses());
            println!("Date range: {} days", summary.span_days());
            println!(
                "Registrations from {} to {}",
                timestamp::format_display(&summary.first_registration),
                timestamp::format_display(&summary.last_registration)
            );
        }
    }

    Ok(())
}
