mod api;
mod calculator;
mod catalog;
mod db;
mod error;
mod parser;
mod scrape;
mod settings;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use db::{CatalogStore, SeedOutcome};
use scrape::PageScraper;
use settings::Settings;

#[derive(Parser)]
#[command(name = "orange_prices", about = "Orange market prices, catalog and price calculator")]
struct Cli {
    /// SQLite database path (overrides ORANGE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides ORANGE_BIND)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Create tables and seed reference data if the catalog is empty
    Init,
    /// Insert reference oranges and measurements
    Seed {
        /// Wipe the catalog and calculation history first
        #[arg(long)]
        force: bool,
    },
    /// Put every reference orange back to its default price per kg
    ResetPrices,
    /// Fetch and print today's scraped orange prices
    Scrape,
    /// Show catalog statistics
    Stats,
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
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    let store = CatalogStore::new(&settings.db_path);

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            init_store(&store)?;
            let scraper = PageScraper::new(&settings.source_url, settings.timeout())?;
            let app = api::router(api::AppState { store, scraper });

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
        Commands::Init => {
            init_store(&store)?;
            println!("Database ready: {}", store.path().display());
        }
        Commands::Seed { force } => {
            store.init_schema()?;
            match store.seed(force)? {
                SeedOutcome::Seeded { products, measurements } => {
                    println!("Seeded {} orange types, {} measurements.", products, measurements);
                }
                SeedOutcome::AlreadySeeded(p) => {
                    println!(
                        "Database already has data ({} @ {} THB/kg). Use --force to re-seed.",
                        p.name, p.price_per_kg
                    );
                }
            }
        }
        Commands::ResetPrices => {
            store.init_schema()?;
            reset_prices(&store)?;
        }
        Commands::Scrape => {
            let scraper = PageScraper::new(&settings.source_url, settings.timeout())?;
            let records = scraper.fetch_prices().await?;

            println!(
                "{:<24} | {:<12} | {:>9} | {:>9} | {:<6}",
                "Name", "Grade", "Min", "Max", "Unit"
            );
            println!("{}", "-".repeat(72));
            for r in &records {
                println!(
                    "{:<24} | {:<12} | {:>9.2} | {:>9.2} | {:<6}",
                    r.name, r.grade, r.price_min, r.price_max, r.unit
                );
            }
            println!("\n{} rows from {}", records.len(), scraper.url());
        }
        Commands::Stats => {
            store.init_schema()?;
            println!("Orange types: {}", store.count_product_types()?);
            println!("Calculations: {}", store.count_calculations()?);
            match store.most_frequent_calculation_product()? {
                Some(top) => println!("Most calculated: {} ({}x)", top.orange_id, top.count),
                None => println!("Most calculated: -"),
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn init_store(store: &CatalogStore) -> anyhow::Result<()> {
    store.init_schema()?;
    if let SeedOutcome::Seeded { products, .. } = store.seed(false)? {
        info!("Seeded {} orange types into {}", products, store.path().display());
    }
    Ok(())
}

fn reset_prices(store: &CatalogStore) -> anyhow::Result<()> {
    let mut updated = 0;
    for (id, _, price, _, _) in db::SEED_PRODUCTS {
        match store.get_product_type(id)? {
            Some(p) => {
                store.update_unit_price(id, *price)?;
                updated += 1;
                println!("Updated {}: {} -> {} THB/kg", p.name, p.price_per_kg, price);
            }
            None => println!("Orange {} not found in database", id),
        }
    }
    println!("\nReset {} prices.", updated);
    Ok(())
}
