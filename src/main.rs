mod config;
mod fetch;
mod parser;
mod pipeline;
mod record;
mod sink;

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use config::{LibraryConfig, NewsConfig};
use fetch::SpiderFetcher;
use pipeline::{LibrarySource, NewsSource};

#[derive(Parser)]
#[command(
    name = "esma_scraper",
    about = "ESMA regulatory publications scraper via spider.cloud"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the documents library (paginated, date-filtered)
    Documents {
        /// Exclude records published before this date (the date itself is kept)
        #[arg(long, default_value = "2025-01-01")]
        threshold: NaiveDate,
        /// Listing pages to visit per URL
        #[arg(short = 'n', long, default_value_t = 3)]
        pages: u32,
        #[arg(long, default_value = "esma_scraped_all_data.json")]
        out: PathBuf,
        #[arg(long, default_value = "esma_scraped_documents_filtered_type_data.json")]
        filtered_out: PathBuf,
        /// Document type routed to the secondary output
        #[arg(long, default_value = "Press Release")]
        filtered_type: String,
    },
    /// Scrape the news index (single page per URL)
    News {
        #[arg(long, default_value = "esma_scraped_news_data.json")]
        out: PathBuf,
    },
    /// Documents + news in one go
    All,
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
    let fetcher = SpiderFetcher::from_env()?;

    let result = match cli.command {
        Commands::Documents {
            threshold,
            pages,
            out,
            filtered_out,
            filtered_type,
        } => {
            let cfg = LibraryConfig {
                threshold,
                pages_per_listing: pages,
                all_out: out,
                filtered_out,
                filtered_type,
                ..LibraryConfig::default()
            };
            scrape_documents(cfg, &fetcher).await
        }
        Commands::News { out } => {
            let cfg = NewsConfig {
                out,
                ..NewsConfig::default()
            };
            scrape_news(cfg, &fetcher).await
        }
        Commands::All => {
            scrape_documents(LibraryConfig::default(), &fetcher).await?;
            scrape_news(NewsConfig::default(), &fetcher).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape_documents(cfg: LibraryConfig, fetcher: &SpiderFetcher) -> anyhow::Result<()> {
    let all_out = cfg.all_out.clone();
    let filtered_out = cfg.filtered_out.clone();
    let source = LibrarySource::new(cfg);

    let output = pipeline::run(&source, fetcher).await?;

    sink::persist(&output.records, &all_out)?;
    println!("Scraping complete! {} records saved.", output.records.len());
    sink::persist(&output.filtered, &filtered_out)?;
    println!(
        "Scraping complete! {} filtered records saved.",
        output.filtered.len()
    );
    Ok(())
}

async fn scrape_news(cfg: NewsConfig, fetcher: &SpiderFetcher) -> anyhow::Result<()> {
    let out = cfg.out.clone();
    let source = NewsSource::new(cfg);

    let output = pipeline::run(&source, fetcher).await?;

    sink::persist(&output.records, &out)?;
    println!("Scraping complete! {} records saved.", output.records.len());
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
