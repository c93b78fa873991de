use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use hn_core::{
    Document, DocumentKind, DocumentStore, Error, Result, DEFAULT_VECTOR_SIZE,
};
use hn_fetcher::{HnClient, IngestPipeline, IngestReport, PipelineConfig, ProcessedIndex};
use hn_inference::eval;
use hn_inference::{create_model, Config as InferenceConfig, RagEngine};
use hn_web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Retrieval-augmented QA over HackerNews", long_about = None)]
struct Cli {
    /// Storage backend: memory, sqlite, or chroma (feature-gated).
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// Override the storage backend's server URL.
    #[arg(long)]
    backend_url: Option<String>,
    /// Inference model: ollama (feature-gated), huggingface, or dummy.
    #[arg(long, default_value = "ollama")]
    model: String,
    /// Model server URL, e.g. http://localhost:11434/llama3.2
    #[arg(long)]
    model_url: Option<String>,
    /// API key for hosted models.
    #[arg(long)]
    api_key: Option<String>,
    /// Directory holding the processed-id index and file-backed stores.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the fetch → dedup → embed → index pipeline once.
    Ingest {
        #[arg(long, default_value_t = 10)]
        stories_per_category: usize,
        /// Maximum comment-tree depth to follow.
        #[arg(long, default_value_t = 5)]
        max_comments: usize,
    },
    /// Ask a single question against the indexed content.
    Ask { question: String },
    /// Serve the JSON query API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Score the engine against a JSON file of question/answer pairs.
    Evaluate { file: PathBuf },
}

fn healthcheck_document() -> Document {
    Document {
        id: "healthcheck".to_string(),
        source_id: "healthcheck".to_string(),
        kind: DocumentKind::Story,
        author: "healthcheck".to_string(),
        posted_at: Utc::now(),
        category: "healthcheck".to_string(),
        text: "Storage healthcheck".to_string(),
    }
}

async fn check_storage(storage: &Arc<dyn DocumentStore>) -> Result<()> {
    let document = healthcheck_document();
    let embedding = vec![0.0; DEFAULT_VECTOR_SIZE as usize];
    storage.store_document(&document, &embedding).await?;

    let stored = storage.get_by_category("healthcheck").await?;
    if !stored.iter().any(|d| d.id == document.id) {
        return Err(Error::Storage(
            "Failed to read back healthcheck document".to_string(),
        ));
    }

    if let Err(e) = storage.delete_document(&document.id).await {
        info!("⚠️ Failed to clean up healthcheck document: {}", e);
    }
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn DocumentStore>,
    storage_type: &str,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage)).await {
            Ok(Ok(())) => {
                info!("🏦 Storage backend ready (using {})", storage_type);
                return Ok(());
            }
            Ok(Err(e)) => last_error = Some(e),
            Err(elapsed) => {
                last_error = Some(Error::Storage(format!(
                    "Storage health check timed out: {}",
                    elapsed
                )))
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::Storage("Storage health check failed after all retries".to_string())
    }))
}

fn print_report(report: &IngestReport) {
    if report.is_empty() {
        println!("No new data found - everything is up to date");
    } else {
        println!(
            "Ingested {} stories, {} comments, {} user profiles ({} documents indexed)",
            report.new_stories, report.new_comments, report.new_users, report.documents_indexed
        );
    }
    if report.skipped_items > 0 {
        println!("Skipped {} unavailable or malformed items", report.skipped_items);
    }
}

fn print_answer(answer: &hn_inference::RagAnswer) {
    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!(
                "  - {} ({}, {})",
                source.source_id,
                source.kind.as_str(),
                source.category
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    info!("💾 Initializing storage...");
    let storage = hn_storage::create_storage(
        cli.storage.as_str(),
        cli.backend_url.as_deref(),
        &cli.data_dir,
    )
    .await?;
    check_storage_with_retry(&storage, cli.storage.as_str(), 3, Duration::from_secs(10)).await?;

    let inference_config = InferenceConfig {
        model_name: Some(cli.model.clone()),
        model_url: cli.model_url.clone(),
        api_key: cli.api_key.clone(),
    };
    let model = create_model(inference_config).await?;
    info!("🧠 Inference model initialized (using {})", model.name());

    match cli.command {
        Commands::Ingest {
            stories_per_category,
            max_comments,
        } => {
            let client = HnClient::new()?;
            let tracker = ProcessedIndex::new(cli.data_dir.join("processed_ids.json"));
            let config = PipelineConfig {
                stories_per_category,
                max_comment_depth: max_comments,
                ..Default::default()
            };
            let pipeline = IngestPipeline::new(client, tracker, storage, model, config);
            let report = pipeline.run().await?;
            print_report(&report);
        }
        Commands::Ask { question } => {
            let engine = RagEngine::new(storage, model);
            let answer = engine.answer(&question).await?;
            print_answer(&answer);
        }
        Commands::Serve { addr } => {
            let engine = RagEngine::new(storage.clone(), model);
            hn_web::serve(&addr, AppState::new(engine, storage)).await?;
        }
        Commands::Evaluate { file } => {
            let engine = RagEngine::new(storage, model);
            let cases = eval::load_cases(&file).await?;
            if cases.is_empty() {
                println!("No evaluation cases in {}", file.display());
                return Ok(());
            }
            let outcomes = eval::evaluate(&engine, &cases).await?;
            for outcome in &outcomes {
                println!("{:.4}  {}", outcome.score, outcome.question);
            }
            println!("Mean score: {:.4}", eval::mean_score(&outcomes));
        }
    }

    Ok(())
}
