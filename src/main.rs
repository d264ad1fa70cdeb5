// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use lit_review::utils::logging::{
    format_error, format_info, format_step, format_status, format_success, format_warning,
};
use lit_review::{
    ArxivSearchClient, Chunker, CitationExtractor, Config, Document, GeminiClient,
    GoogleSearchClient, HealthCheck,
    HealthReport, JsonExporter, LanguageModel, PdfExtractor, PerformanceMetrics,
    PipelineOrchestrator, ProgressTracker, ReportWriter, SearchCapability, Validator,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lit_review")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(
    about = "Summarize research papers, map their citations, and surface research gaps",
    long_about = None
)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml",
        global = true
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a set of papers and synthesize a review across them
    Review(ReviewArgs),

    /// Extract text, chunks and references offline, without any capability calls
    Extract {
        #[arg(value_name = "PDF")]
        paper: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Query a search source directly
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        #[arg(long, value_enum, default_value_t = SearchSource::Arxiv)]
        source: SearchSource,
    },

    /// Check credentials and capability reachability
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchSource {
    /// Google Custom Search (needs GOOGLE_API_KEY and GOOGLE_SEARCH_ENGINE_ID)
    Google,
    /// arXiv query API, no credentials
    Arxiv,
}

#[derive(Args)]
struct ReviewArgs {
    #[arg(required = true, value_name = "PDF")]
    papers: Vec<PathBuf>,

    /// Directory for JSON results
    #[arg(short, long, value_name = "DIR")]
    export: Option<PathBuf>,

    #[arg(short, long)]
    pretty: bool,

    /// Markdown report destination
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Heading of the markdown report
    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    lit_review::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::Review(args) => {
            cmd_review(config, args, cli.color).await?;
        }
        Commands::Extract { paper, json } => {
            cmd_extract(&config, &paper, json).await?;
        }
        Commands::Search {
            query,
            limit,
            source,
        } => {
            cmd_search(&config, &query, limit, source).await?;
        }
        Commands::Check => {
            cmd_check(&config).await?;
        }
    }

    Ok(())
}

async fn read_paper(path: &Path) -> Result<(String, Vec<u8>)> {
    Validator::validate_file_path(path)?;
    if let Err(e) = Validator::validate_pdf_extension(path) {
        warn!("{}", e);
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok((label, bytes))
}

async fn cmd_review(config: Config, args: ReviewArgs, color: bool) -> Result<()> {
    let start_time = Instant::now();
    let total_steps = 3;

    println!("{}", format_step(1, total_steps, "Reading papers"));
    let mut files = Vec::with_capacity(args.papers.len());
    for path in &args.papers {
        match read_paper(path).await {
            Ok(file) => files.push(file),
            Err(e) => eprintln!("{}", format_error(&format!("{}: {:#}", path.display(), e))),
        }
    }
    if files.is_empty() {
        anyhow::bail!("No readable papers were given");
    }

    let progress = Arc::new(if std::io::stderr().is_terminal() {
        ProgressTracker::new(color)
    } else {
        ProgressTracker::hidden()
    });
    let orchestrator = PipelineOrchestrator::from_config(config)
        .context("Failed to initialize the review pipeline")?
        .with_progress(progress.clone());

    println!(
        "{}",
        format_step(2, total_steps, &format!("Processing {} papers", files.len()))
    );
    let results = orchestrator.process_corpus(files).await;
    progress.finish();

    for (label, result) in &results {
        if let Ok(document) = result {
            println!("{}", format_success(&format!("{}: ready", label)));
            if !document.chunk_warnings.is_empty() {
                println!(
                    "  {}",
                    format_warning(&format!(
                        "{} chunks could not be summarized",
                        document.chunk_warnings.len()
                    ))
                );
            }
            if !document.citation_warnings.is_empty() {
                println!(
                    "  {}",
                    format_warning(&format!(
                        "{} references could not be parsed",
                        document.citation_warnings.len()
                    ))
                );
            }
        }
    }
    for event in orchestrator.statuses().await {
        if event.status.is_failed() {
            println!("{}", format_status(&event.label, &event.status));
        }
    }

    println!("{}", format_step(3, total_steps, "Synthesizing"));
    let synthesis = orchestrator.synthesize().await.context("Synthesis failed")?;
    println!(
        "{}",
        format_info(&format!(
            "{} documents, {} citation links, {} research gaps",
            synthesis.documents,
            synthesis.graph.edge_count(),
            synthesis.gaps.len()
        ))
    );
    for (i, gap) in synthesis.gaps.iter().enumerate() {
        println!("  {}. {} ({:.2})", i + 1, gap.description, gap.confidence);
    }

    let snapshot = orchestrator.snapshot().await;

    if let Some(dir) = args.export {
        let exporter = JsonExporter::new(&dir).context("Failed to create export directory")?;
        let manifest = exporter
            .export_run(&snapshot, args.pretty)
            .context("JSON export failed")?;
        println!(
            "{}",
            format_success(&format!(
                "Exported {} files to {}",
                manifest.files.len() + 1,
                dir.display()
            ))
        );
    }

    if let Some(path) = args.report {
        let writer = match args.title {
            Some(title) => ReportWriter::new().with_title(title),
            None => ReportWriter::new(),
        };
        writer
            .write(&path, &snapshot)
            .context("Failed to write report")?;
        println!(
            "{}",
            format_success(&format!("Report written to {}", path.display()))
        );
    }

    orchestrator.stats().log_summary();
    let metrics = PerformanceMetrics::new("review", results.len(), start_time.elapsed());
    info!("{}", metrics.format());

    Ok(())
}

async fn cmd_extract(config: &Config, path: &Path, json: bool) -> Result<()> {
    let (label, bytes) = read_paper(path).await?;
    let document_id = Document::compute_id(&bytes);

    let extractor = PdfExtractor::with_max_size_mb(config.pipeline.max_pdf_size_mb);
    let id = document_id.clone();
    let document = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &id))
        .await
        .context("Extraction task failed")?
        .with_context(|| format!("Failed to extract {}", label))?;

    let chunks = Chunker::new(config.chunking)?.chunk(&document);
    let extraction = CitationExtractor::new().extract(&document_id, &chunks);

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
        return Ok(());
    }

    println!(
        "{}",
        format_success(&format!(
            "{}: {}",
            label,
            document.title.as_deref().unwrap_or("(untitled)")
        ))
    );
    println!("  Document id: {}", document.short_id());
    println!("  Pages: {}", document.pages.len());
    let low = document.low_confidence_pages();
    if !low.is_empty() {
        println!("  {}", format_warning(&format!("No text on pages {:?}", low)));
    }
    println!("  Chunks: {}", chunks.len());
    println!("  References: {}", extraction.citations.len());

    for citation in &extraction.citations {
        let number = citation
            .number
            .map(|n| format!("[{}] ", n))
            .unwrap_or_default();
        let year = citation.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        println!(
            "    {}{}{} - cited {} times",
            number,
            citation.title.as_deref().unwrap_or("?"),
            year,
            citation.markers.len()
        );
    }

    for warning in &extraction.warnings {
        println!(
            "  {}",
            format_warning(&format!(
                "{}: {}",
                Validator::truncate_text(&warning.raw, 60),
                warning.reason
            ))
        );
    }

    Ok(())
}

async fn cmd_search(
    config: &Config,
    query: &str,
    limit: usize,
    source: SearchSource,
) -> Result<()> {
    info!("Searching for: {}", query);

    let client: Box<dyn SearchCapability> = match source {
        SearchSource::Google => Box::new(
            GoogleSearchClient::new(&config.capability, &config.credentials, limit)
                .context("Search is not configured")?,
        ),
        SearchSource::Arxiv => Box::new(ArxivSearchClient::new(&config.capability, limit)?),
    };
    let results = client.search(query).await.context("Search failed")?;

    if results.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("{}", "=".repeat(80));
    for (idx, result) in results.iter().enumerate() {
        print!("\n{}. {}", idx + 1, result.format_summary(300));
    }
    println!("\n{}", "=".repeat(80));

    Ok(())
}

async fn cmd_check(config: &Config) -> Result<()> {
    let mut checks = Vec::new();

    match GeminiClient::new(&config.capability, &config.credentials) {
        Ok(client) => {
            let started = Instant::now();
            let probe = client
                .summarize_chunk("This note checks that the summarization service responds.")
                .await
                .map(|_| ());
            checks.push(HealthCheck::from_probe(client.name(), probe, started.elapsed()));
        }
        Err(e) => checks.push(HealthCheck::skipped("gemini", e.to_string(), true)),
    }

    if config.credentials.has_search() {
        let client = GoogleSearchClient::new(&config.capability, &config.credentials, 1)?;
        let started = Instant::now();
        let probe = client.search("literature review").await.map(|_| ());
        checks.push(HealthCheck::from_probe(client.name(), probe, started.elapsed()));
    } else {
        checks.push(HealthCheck::skipped(
            "google-search",
            "Search credentials not set; Custom Search enrichment skipped",
            false,
        ));
    }

    if config.gaps.use_arxiv {
        let client = ArxivSearchClient::new(&config.capability, 1)?;
        let started = Instant::now();
        let probe = client.search("literature review").await.map(|_| ());
        checks.push(HealthCheck::from_probe(client.name(), probe, started.elapsed()));
    }

    let report = HealthReport::new(checks, env!("CARGO_PKG_VERSION"));
    println!("{}", report.format());

    if !report.is_usable() {
        anyhow::bail!("Review pipeline is not usable");
    }
    Ok(())
}
