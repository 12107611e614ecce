//! # Demo Quote Generator
//!
//! Populates the database with a vendor catalog, a template and one priced
//! demo quote for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./avquote.db (or AVQUOTE_DATABASE_PATH)
//! cargo run -p avquote-db --bin seed
//!
//! # Five identical huddle rooms instead of three
//! cargo run -p avquote-db --bin seed -- --huddles 5
//!
//! # Specify database path
//! cargo run -p avquote-db --bin seed -- --db ./data/avquote_dev.db
//! ```
//!
//! ## Generated Quote
//! - Boardroom: video conferencing system from the catalog, cabling
//!   (tax exempt), installer labor, programming at 5% of equipment
//! - Huddle room × N: display and soundbar, conference room template
//! - One restore, so the history shows a restored version

use std::env;

use avquote_core::catalog::{ColumnMapping, ImportSource};
use avquote_core::template::{TemplateLabor, TemplateService};
use avquote_core::{
    Equipment, Labor, NewQuote, QuoteStatus, QuoteTemplate, Room, Service, ServicePricing, System,
    TaxSettings,
};
use avquote_db::{Database, StoreConfig};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AUTHOR: &str = "seed";

/// Catalog rows as they come out of a vendor spreadsheet.
const CATALOG_HEADERS: &[&str] = &["Item", "Model", "Dealer Cost", "Notes"];
const CATALOG_ROWS: &[[&str; 4]] = &[
    ["Video Bar", "Rally Bar", "$3,299.00", "All-in-one camera and audio"],
    ["Touch Controller", "Tap IP", "899.00", "Room scheduling and control"],
    ["65in Display", "QM65B", "1,450.00", "4K commercial display"],
    ["Soundbar", "SB-200", "399.99", "Huddle room audio"],
    ["Ceiling Microphone", "MXA920", "call for price", "Skipped: no price"],
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,avquote=debug,sqlx=warn")),
        )
        .init();

    let mut config = StoreConfig::load()?;
    let mut huddles: i64 = 3;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--huddles" | "-n" => {
                if i + 1 < args.len() {
                    huddles = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("AV Quote Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --huddles <N>  Number of identical huddle rooms (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: AVQUOTE_DATABASE_PATH or ./avquote.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("AV Quote Demo Seeder");
    println!("====================");
    println!("Database: {}", config.database_path.display());
    println!("Huddle rooms: {}", huddles);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.quotes().list(None).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} quotes", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Vendor catalog
    let headers: Vec<Option<String>> = CATALOG_HEADERS.iter().map(|h| Some(h.to_string())).collect();
    let rows: Vec<Vec<Option<String>>> = CATALOG_ROWS
        .iter()
        .map(|row| row.iter().map(|c| Some(c.to_string())).collect())
        .collect();
    let mapping = ColumnMapping {
        item_name: "Item".to_string(),
        price: "Dealer Cost".to_string(),
        description: Some("Notes".to_string()),
        model: Some("Model".to_string()),
    };
    let source = ImportSource {
        vendor: "Demo AV Supply".to_string(),
        department_id: None,
        all_departments: true,
    };
    let outcome = db.vendor_prices().import(&headers, &rows, &mapping, &source).await?;
    println!("✓ Imported {} catalog prices", outcome.prices.len());
    for error in &outcome.errors {
        println!("  {}", error);
    }

    let catalog_item = |name: &str| {
        outcome
            .prices
            .iter()
            .find(|p| p.item_name == name)
            .cloned()
            .ok_or_else(|| format!("catalog item '{}' missing", name))
    };
    let video_bar = catalog_item("Video Bar")?;
    let controller = catalog_item("Touch Controller")?;
    let display = catalog_item("65in Display")?;
    let soundbar = catalog_item("Soundbar")?;

    // Template
    let mut template = QuoteTemplate::new(
        "Huddle Room Standard",
        TaxSettings {
            tax_rate: Decimal::new(825, 2),
            tax_enabled: true,
        },
        AUTHOR,
    );
    template.labor.push(TemplateLabor {
        role_name: "Installer".to_string(),
        cost_rate: Decimal::from(45),
        sell_rate: Decimal::from(95),
        hours: Decimal::from(4),
        department_id: None,
    });
    template.services.push(TemplateService {
        service_name: "Freight".to_string(),
        pricing: ServicePricing::Flat {
            amount: Decimal::from(75),
        },
        cost: Some(Decimal::from(60)),
        department_id: None,
        description: None,
    });
    db.templates().create(&template).await?;
    println!("✓ Created template '{}'", template.name);

    // Quote
    let quote = db
        .quotes()
        .create(
            NewQuote {
                name: "HQ Meeting Spaces".to_string(),
                client_name: "Northwind Traders".to_string(),
                department_id: "dept-av".to_string(),
                project_address: Some("100 Main St, Springfield".to_string()),
                ..NewQuote::default()
            },
            AUTHOR,
        )
        .await?;
    let quote_id = quote.quote.id.clone();

    let tree = db
        .quotes()
        .mutate(&quote_id, AUTHOR, |tree| {
            let boardroom = tree.add_room(Room::new("", "Boardroom", 1))?.room.id.clone();
            let vc = System::new(&boardroom, "Video Conferencing");
            let vc_id = vc.id.clone();
            tree.add_system(vc)?;
            tree.add_equipment(Equipment::from_vendor_price(&boardroom, &video_bar, 1).in_system(&vc_id))?;
            tree.add_equipment(Equipment::from_vendor_price(&boardroom, &controller, 2).in_system(&vc_id))?;
            tree.add_equipment(Equipment::from_vendor_price(&boardroom, &display, 2).in_system(&vc_id))?;
            tree.add_equipment(
                Equipment::new(&boardroom, "Cable & connectors", 1, Decimal::from(250))
                    .with_markup_override(Decimal::from(40))
                    .tax_exempt(),
            )?;
            tree.add_labor(Labor::new(
                &boardroom,
                "Installer",
                Decimal::from(45),
                Decimal::from(95),
                Decimal::from(16),
            ))?;
            tree.add_service(Service::percent_of_equipment(&boardroom, "Programming", Decimal::from(5)))?;

            let huddle = tree.add_room(Room::new("", "Huddle Room", huddles))?.room.id.clone();
            tree.add_equipment(Equipment::from_vendor_price(&huddle, &display, 1))?;
            tree.add_equipment(Equipment::from_vendor_price(&huddle, &soundbar, 1))?;
            Ok(())
        })
        .await?;
    println!("✓ Built quote '{}' with {} rooms", tree.quote.name, tree.rooms.len());

    let huddle_id = tree.rooms[1].room.id.clone();
    db.quotes()
        .apply_template(&quote_id, &huddle_id, &template.id, AUTHOR)
        .await?;
    db.quotes()
        .set_status(&quote_id, QuoteStatus::Pending, AUTHOR)
        .await?;
    let latest = db.versions().restore(&quote_id, 3, AUTHOR).await?;
    info!(quote_id = %quote_id, version = latest.quote.version, "Demo quote ready");

    println!();
    println!("Version history:");
    for version in db.versions().list(&quote_id).await? {
        println!("  v{} by {} at {}", version.version, version.author, version.created_at);
    }

    println!();
    println!("Financial summary:");
    let summary = db.quotes().summary(&quote_id).await?;
    println!("{}", serde_json::to_string_pretty(&summary.totals)?);

    let bom = db.quotes().bom(&quote_id).await?;
    println!();
    println!("Bill of materials: {} items, {} units", bom.item_count, bom.total_quantity);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
