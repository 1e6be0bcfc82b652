//! # Khoj CLI (`khoj`)
//!
//! ## Usage
//!
//! ```bash
//! khoj --config ./config/khoj.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `khoj serve` | Start the HTTP server |
//! | `khoj search "<query>"` | Search the product index by text |
//! | `khoj detect <image>` | Show the dishes recognized in an image |
//! | `khoj khoj <image>` | Run the full image search and print JSON |
//! | `khoj ping` | Check that the product index is reachable |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use khoj::config;
use khoj::models::Product;
use khoj::pipeline::Pipeline;
use khoj::{server, telemetry};

/// Khoj: find catalog products from a text query or a photograph of a dish.
#[derive(Parser)]
#[command(name = "khoj", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/khoj.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `/search`, `/khoj` and `/health`.
    Serve,

    /// Search the product index by text.
    Search {
        /// Text matched against name, category, sub-category, brand and type.
        query: String,

        /// Print the raw JSON product array instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Send an image to the recognition service and print the detected dishes.
    Detect {
        /// Path to a photo (JPEG or PNG).
        image: PathBuf,
    },

    /// Run the full image search and print the response JSON.
    Khoj {
        /// Path to a photo (JPEG or PNG).
        image: PathBuf,
    },

    /// Check that the product index is reachable.
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search { query, json } => {
            let pipeline = Pipeline::from_config(&cfg)?;
            let result = pipeline.search_text(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result.products)?);
            } else {
                print_products(&result.products, result.total_hits);
            }
        }
        Commands::Detect { image } => {
            let pipeline = Pipeline::from_config(&cfg)?;
            let bytes = read_image(&image)?;
            let detections = pipeline.detect(&bytes).await?;
            if detections.is_empty() {
                println!("No dishes detected.");
            }
            for dish in &detections {
                match dish.confidence {
                    Some(c) => println!("{} ({:.2})", dish.name, c),
                    None => println!("{}", dish.name),
                }
                println!("    keywords: {}", dish.keywords.join(", "));
            }
        }
        Commands::Khoj { image } => {
            let pipeline = Pipeline::from_config(&cfg)?;
            let bytes = read_image(&image)?;
            let response = pipeline.search_image(&bytes).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Ping => {
            let pipeline = Pipeline::from_config(&cfg)?;
            pipeline.index().ping().await?;
            println!("index '{}' at {} is reachable", cfg.index.name, cfg.index.url);
        }
    }

    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
}

fn print_products(products: &[Product], total_hits: u64) {
    if products.is_empty() {
        println!("No results.");
        return;
    }

    for (i, p) in products.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, p.name, p.brand);
        println!("    category: {} / {}", p.category, p.sub_category);
        println!(
            "    price: {:.2} (market {:.2})  rating: {:.1}",
            p.sale_price, p.market_price, p.rating
        );
        println!("    id: {}", p.id);
        println!();
    }
    println!("showing {} of {} matches", products.len(), total_hits);
}
