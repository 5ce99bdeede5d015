//! Command-line entrypoint for segmenting text and ingesting local files.
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rustyingest::{
    config,
    datastore::MemoryStore,
    extraction::{HttpExtractor, RoutingExtractor},
    logging,
    processing::{
        DocumentContext, IngestionApi, IngestionPipeline, IngestionService, ProcessingProgress,
        ProcessingReport, RetryPolicy, UploadedFile, discover_files, segment_document,
        summarize_batch,
    },
    storage::FsUploader,
};

#[derive(Parser)]
#[command(
    name = "rusty-ingest",
    about = "Segment documents and ingest them into the datastore"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the paragraph/sentence tree of a text file as JSON.
    Segment { path: PathBuf },
    /// Upload, extract, segment, and store files. Directories are walked recursively.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Project the documents belong to.
        #[arg(long)]
        project: String,
        /// Attempts per file when ingesting a single file.
        #[arg(long)]
        retries: Option<u32>,
        /// Keep rows in memory and uploads in a temporary directory.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Segment { path } => {
            segment(&path).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ingest {
            paths,
            project,
            retries,
            dry_run,
        } => ingest(&paths, &project, retries, dry_run).await,
    }
}

async fn segment(path: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = segment_document(&text).context("segmentation failed")?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn ingest(
    paths: &[PathBuf],
    project: &str,
    retries: Option<u32>,
    dry_run: bool,
) -> Result<ExitCode> {
    if project.trim().is_empty() {
        bail!("--project must not be empty");
    }
    let files = discover_files(paths).context("failed to enumerate input paths")?;
    if files.is_empty() {
        bail!("no files found under the given paths");
    }

    let service = if dry_run {
        dry_run_service()?
    } else {
        let config = config::init_config().context("failed to load configuration")?;
        IngestionService::from_config(config).context("failed to initialize ingestion service")?
    };

    let mut uploads = Vec::with_capacity(files.len());
    for path in &files {
        uploads.push(
            UploadedFile::from_path(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        );
    }
    let context = DocumentContext::new(project.trim());

    if let [file] = uploads.as_slice() {
        let policy = match retries {
            Some(max_attempts) => RetryPolicy {
                max_attempts,
                ..service.retry_policy()
            },
            None => service.retry_policy(),
        };
        let print = |progress: ProcessingProgress| print_progress(&file.file_name, &progress);
        let result = service
            .pipeline()
            .run_with_retry(file, &context, &print, policy)
            .await;
        let report = ProcessingReport::from_result(result, Vec::new());
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let print = |index: usize, progress: ProcessingProgress| {
        if let Some(file) = uploads.get(index) {
            print_progress(&file.file_name, &progress);
        }
    };
    let results = service.pipeline().run_batch(&uploads, &context, &print).await;
    let stats = summarize_batch(&results);
    for (file, result) in uploads.iter().zip(&results) {
        match result {
            Ok(ingested) => eprintln!(
                "ok    {} ({} paragraphs, {} sentences)",
                file.file_name,
                ingested.paragraphs.len(),
                ingested.sentences.len()
            ),
            Err(error) => eprintln!("fail  {} [{}] {error}", file.file_name, error.stage()),
        }
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(if stats.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn dry_run_service() -> Result<IngestionService> {
    dotenvy::dotenv().ok();
    let remote = std::env::var("EXTRACTION_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(|url| HttpExtractor::new(&url))
        .transpose()
        .context("invalid EXTRACTION_URL")?;
    let upload_dir = std::env::temp_dir().join("rusty-ingest-dry-run");
    tracing::info!(dir = %upload_dir.display(), "Dry run: rows stay in memory");
    let pipeline = IngestionPipeline::new(
        Arc::new(FsUploader::new(upload_dir)),
        Arc::new(RoutingExtractor::new(remote)),
        Arc::new(MemoryStore::new()),
    );
    Ok(IngestionService::new(pipeline, RetryPolicy::default()))
}

fn print_progress(file_name: &str, progress: &ProcessingProgress) {
    match &progress.error {
        Some(error) => eprintln!("{file_name}: {} {error}", progress.stage),
        None => eprintln!(
            "{file_name}: {:>3}% {:<10} {}",
            progress.progress, progress.stage, progress.message
        ),
    }
}
