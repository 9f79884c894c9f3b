//! Command-line front end for the ingestion pipeline
//!
//! Run with: cargo run -p docai --features cli --bin docai -- ingest report.pdf

use clap::{Parser, Subcommand};
use console::style;
use docai::{config::DocaiConfig, types::DocumentView, FileOutcome, Ingestor};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docai", about = "Extract, enhance and store document text", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a single file
    Ingest {
        path: PathBuf,
        /// Store the raw extracted text
        #[arg(long)]
        no_enhance: bool,
    },
    /// Ingest every supported file under a directory
    IngestDir {
        path: PathBuf,
        #[arg(long)]
        no_enhance: bool,
    },
    /// Print a stored document as JSON
    Show { id: i64 },
    /// Run enhancement again on a stored document
    Enhance { id: i64 },
    /// List stored documents
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = DocaiConfig::load(cli.config.as_deref())?;
    let ingestor = Ingestor::from_config(&config)?;

    match cli.command {
        Command::Ingest { path, no_enhance } => {
            let spinner = spinner(format!("Ingesting {}", path.display()));
            let outcome = ingestor.ingest_file_outcome(&path, !no_enhance).await;
            spinner.finish_and_clear();

            match outcome? {
                FileOutcome::Ingested { id } => {
                    eprintln!("{} {}", style("✓").green(), path.display());
                    println!("{}", id);
                }
                FileOutcome::Failed { stage, reason } => {
                    anyhow::bail!("{} failed at {} stage: {}", path.display(), stage, reason)
                }
            }
        }
        Command::IngestDir { path, no_enhance } => {
            let spinner = spinner(format!("Ingesting files under {}", path.display()));
            let report = ingestor.ingest_directory_report(&path, !no_enhance).await;
            spinner.finish_and_clear();
            let report = report?;

            for id in report.document_ids() {
                println!("{}", id);
            }
            for failure in report.failures() {
                eprintln!(
                    "{} {} ({}): {}",
                    style("✗").red(),
                    failure.path,
                    failure.stage,
                    failure.error
                );
            }
            eprintln!(
                "{} ingested, {} failed",
                style(report.succeeded()).green().bold(),
                style(report.failed()).red().bold()
            );
        }
        Command::Show { id } => {
            let record = ingestor
                .get_document(id)
                .await?
                .ok_or(docai::Error::DocumentNotFound(id))?;
            println!("{}", serde_json::to_string_pretty(&DocumentView::from(record))?);
        }
        Command::Enhance { id } => {
            let record = ingestor
                .reenhance(id)
                .await?
                .ok_or(docai::Error::DocumentNotFound(id))?;
            println!("{}", record.content.unwrap_or_default());
        }
        Command::List => {
            for record in ingestor.list_documents().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id,
                    record.file_type,
                    record.created_at.to_rfc3339(),
                    record.filename
                );
            }
        }
    }

    Ok(())
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
