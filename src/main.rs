mod archive;
mod config;
mod discover;
mod errors;
mod extract;
mod images;
mod load;
mod model;
mod sanitize;
mod storage;
mod transform;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::config::Config;
use crate::discover::UrlDiscoverer;
use crate::extract::PageExtractor;
use crate::images::ImageRenditionPipeline;
use crate::load::MigrationLoader;
use crate::model::NormalizedDocument;
use crate::storage::{BlobStore, S3Store};
use crate::transform::ArticleTransformer;

const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Parser)]
#[command(name = "news_migrator", about = "One-way legacy news site migration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List article URLs found on the legacy archive index
    Discover {
        /// Last archive index page to walk
        #[arg(short = 'p', long)]
        max_page: u32,
    },
    /// Extract articles into the intermediate archive file
    Extract {
        #[arg(short = 'p', long)]
        max_page: u32,
        /// Max articles to extract (default: all discovered)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Transform the archive (images included) and load it into the destination
    Migrate {
        /// Max articles to migrate (default: whole archive)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract + migrate in one pipeline
    Run {
        #[arg(short = 'p', long)]
        max_page: u32,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;

    let result = match cli.command {
        Commands::Discover { max_page } => {
            let discoverer = UrlDiscoverer::new(&config, client.clone())?;
            let urls = discoverer.discover(max_page).await?;
            for url in &urls {
                println!("{url}");
            }
            println!("{} article URLs across {} archive pages", urls.len(), max_page);
            Ok(())
        }
        Commands::Extract { max_page, limit } => {
            run_extract(&config, &client, max_page, limit).await?;
            Ok(())
        }
        Commands::Migrate { limit } => run_migrate(&config, &client, limit).await,
        Commands::Run { max_page, limit } => {
            let t_extract = Instant::now();
            let extracted = run_extract(&config, &client, max_page, limit).await?;
            println!(
                "Extract phase done ({} articles) in {:.1}s",
                extracted,
                t_extract.elapsed().as_secs_f64()
            );
            if extracted == 0 {
                println!("Nothing to migrate.");
                return Ok(());
            }

            let t_migrate = Instant::now();
            run_migrate(&config, &client, limit).await?;
            println!("Migrate phase done in {:.1}s", t_migrate.elapsed().as_secs_f64());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

/// Discover + extract, writing the archive file. Per-article failures are
/// logged and skipped; the run continues. Returns the archived count.
async fn run_extract(
    config: &Config,
    client: &reqwest::Client,
    max_page: u32,
    limit: Option<usize>,
) -> anyhow::Result<usize> {
    let discoverer = UrlDiscoverer::new(config, client.clone())?;
    let mut urls = discoverer.discover(max_page).await?;
    if let Some(n) = limit {
        urls.truncate(n);
    }
    if urls.is_empty() {
        println!("No article URLs found on the archive index.");
        return Ok(0);
    }

    println!("Extracting {} articles...", urls.len());
    let extractor = PageExtractor::new(config, client.clone())?;
    let pb = progress_bar(urls.len());

    let mut docs: Vec<NormalizedDocument> = Vec::with_capacity(urls.len());
    let mut errors = 0usize;
    for url in &urls {
        match extractor.extract(url).await {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                errors += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    archive::write(&config.archive_path, &docs)?;
    println!(
        "Archived {} documents ({} errors) to {}",
        docs.len(),
        errors,
        config.archive_path
    );
    Ok(docs.len())
}

/// Read the archive, regenerate images into blob storage, and load the
/// payloads into the destination API.
async fn run_migrate(
    config: &Config,
    client: &reqwest::Client,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let mut docs = archive::read(&config.archive_path)?;
    if let Some(n) = limit {
        docs.truncate(n);
    }
    if docs.is_empty() {
        println!("Archive is empty. Run 'extract' first.");
        return Ok(());
    }

    let store: Arc<dyn BlobStore> = Arc::new(S3Store::new(&config.storage));
    let transformer = ArticleTransformer::new(
        config.media_base.clone(),
        ImageRenditionPipeline::new(client.clone(), store),
    );

    println!("Transforming {} articles (renditions included)...", docs.len());
    let pb = progress_bar(docs.len());
    let mut payloads = Vec::with_capacity(docs.len());
    for doc in &docs {
        if let Some(payload) = transformer.transform(doc).await {
            payloads.push(payload);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let loader = MigrationLoader::new(config, client.clone());
    let report = loader.load(&payloads).await?;
    report.print();
    Ok(())
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap()
            .progress_chars("=> "),
    );
    pb
}
