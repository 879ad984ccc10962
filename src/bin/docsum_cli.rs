use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use docsum::{
    config,
    logging::{self, LogOutput},
    processing::{LengthTier, LoggingObserver, SummaryApi, SummaryService, Upload},
};

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Summarize PDFs and images from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize one file at a single length and print the summary.
    Summarize {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Length::Medium)]
        length: Length,
        /// Override the media type guessed from the file extension.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Run the full pipeline (all lengths, key points, persistence) and print the record as JSON.
    Process {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Print recently completed documents as JSON.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Length {
    Short,
    Medium,
    Long,
}

impl From<Length> for LengthTier {
    fn from(length: Length) -> Self {
        match length {
            Length::Short => LengthTier::Short,
            Length::Medium => LengthTier::Medium,
            Length::Long => LengthTier::Long,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::load_dotenv();
    logging::init_tracing(LogOutput::Stderr);
    let config = Arc::new(config::init_config().context("Failed to load configuration")?);
    if config.supabase.is_none() && !matches!(cli.command, Command::Summarize { .. }) {
        tracing::warn!("SUPABASE_URL not set; results are not kept after this command exits");
    }
    let service = SummaryService::from_config(config)
        .context("Failed to initialize summary pipeline")?;

    match cli.command {
        Command::Summarize { file, length, mime } => {
            let upload = read_upload(&file, mime).await?;
            let summary = service
                .summarize_upload(upload, length.into())
                .await
                .with_context(|| format!("Failed to summarize {}", file.display()))?;
            println!("{}", summary.summary);
        }
        Command::Process { file, mime } => {
            let upload = read_upload(&file, mime).await?;
            let observer = LoggingObserver::new(upload.filename.clone());
            let record = service
                .process_document(upload, &observer)
                .await
                .with_context(|| format!("Failed to process {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::History { limit } => {
            let documents = service
                .recent_documents(limit)
                .await
                .context("Failed to load history")?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
    }
    Ok(())
}

async fn read_upload(path: &Path, mime: Option<String>) -> Result<Upload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?
        .to_string();
    let content_type = match mime {
        Some(mime) => mime,
        None => guess_mime(path).to_string(),
    };
    Ok(Upload {
        filename,
        content_type,
        bytes,
    })
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
