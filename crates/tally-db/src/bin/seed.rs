//! # Seed Data Loader
//!
//! Loads the starter coffee-shop catalog into a database file.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db (default)
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//!
//! # Also ring up a demo sale and restock, then print today's report
//! cargo run -p tally-db --bin seed -- --demo
//! ```
//!
//! ## Environment
//! - `TALLY_DB_PATH` - database file when `--db` is not given
//! - `TALLY_STOCK_POLICY`, `TALLY_MAX_CONFLICT_RETRIES`,
//!   `TALLY_UTC_OFFSET_MINUTES` - ledger configuration
//! - `RUST_LOG` - log filter (default `info,tally=debug,sqlx=warn`)

use std::env;

use chrono::Utc;
use tally_core::{CartLine, LedgerConfig, Money, PaymentMethod, ReportPeriod, Session};
use tally_db::{seed_coffee_shop, DbConfig, Tally};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "./tally_dev.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("TALLY_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let mut demo = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--demo" => demo = true,
            "--help" | "-h" => {
                println!("Tally POS Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("      --demo         Record a demo sale and restock, print today's report");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    let config = LedgerConfig::from_env()?;
    info!(path = %db_path, policy = %config.stock_policy, "Seeding database");

    let tally = Tally::connect(DbConfig::new(&db_path), config).await?;
    println!("✓ Connected to {db_path}, migrations applied");

    if seed_coffee_shop(&tally).await? {
        println!("✓ Starter catalog loaded");
    } else {
        println!("⚠ Database already has catalog data, skipping seed");
        println!("  Delete the database file to regenerate.");
    }

    for item in tally.catalog().list_inventory_items().await? {
        println!(
            "  {:<14} {:>6} {:<3} @ {:>5}  (min {})",
            item.name,
            item.stock,
            serde_json::to_value(item.unit)?.as_str().unwrap_or_default(),
            item.unit_cost,
            item.min_stock
        );
    }

    if demo {
        run_demo(&tally).await?;
    }

    tally.db().close().await;
    println!();
    println!("✓ Seed complete!");
    Ok(())
}

/// One cash sale, one restock and today's report.
async fn run_demo(tally: &Tally) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Demo shift...");

    let shift = match tally.shifts().current_shift("demo").await? {
        Some(shift) => shift,
        None => tally.shifts().open("demo", Money::from_minor(100_000)).await?,
    };

    let sale = tally
        .sales()
        .commit_sale(
            &Session::for_shift(&shift),
            &[CartLine::new("p1", 2)],
            PaymentMethod::Cash,
            Money::from_minor(50_000),
        )
        .await?;
    println!(
        "  Sale {}: total {}, change {}",
        sale.transaction.id, sale.transaction.grand_total, sale.transaction.change
    );
    for warning in &sale.warnings {
        println!("  ⚠ {} low: {} (min {})", warning.name, warning.stock_after, warning.min_stock);
    }

    let restock = tally
        .ledger()
        .apply_restock("i1", 500, Money::from_minor(150_000))
        .await?;
    println!(
        "  Restock {}: stock {}, unit cost {} → {}",
        restock.item.name,
        restock.item.stock,
        restock.event.unit_cost_before,
        restock.event.unit_cost_after
    );

    let report = tally
        .reports()
        .summarize_period(ReportPeriod::Today, Utc::now())
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
