use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Month, OffsetDateTime, Time};

use sales_dashboard_rs::{SeedRecord, initialize_db, replace_transactions};

/// A utility for creating a test database for the sales dashboard server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The year that the sample transactions are sold in.
    #[arg(long, default_value_t = 2022)]
    year: i32,
}

const CATEGORIES: [&str; 4] = ["men's clothing", "women's clothing", "electronics", "jewelery"];
const PRODUCTS: [&str; 6] = ["Backpack", "Jacket", "Monitor", "Ring", "T-Shirt", "Hard Drive"];

/// Create and populate a database for manual testing.
///
/// The database is marked as seeded so the server does not replace the
/// sample transactions on start up.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating sample transactions...");
    let records = create_sample_records(args.year)?;
    let count = replace_transactions(records, &conn)?;

    println!("Created {count} transactions.");
    println!("Success!");

    Ok(())
}

/// Create a deterministic set of transactions, five for each month of `year`.
fn create_sample_records(year: i32) -> Result<Vec<SeedRecord>, Box<dyn Error>> {
    let mut records = Vec::new();
    let mut month = Month::January;

    for month_index in 0..12_usize {
        for item in 0..5_usize {
            let n = month_index * 5 + item;
            let day = (item * 6 + 1) as u8;
            let date_of_sale = OffsetDateTime::new_utc(
                Date::from_calendar_date(year, month, day)?,
                Time::from_hms((n % 24) as u8, 0, 0)?,
            );
            let product = PRODUCTS[n % PRODUCTS.len()];

            records.push(SeedRecord {
                title: Some(format!("{product} #{n}")),
                description: Some(format!("A sample {} for testing.", product.to_lowercase())),
                // Spread prices across every price range, including some fractional prices.
                price: ((n * 97) % 1000) as f64 + if n % 3 == 0 { 0.49 } else { 0.0 },
                date_of_sale: Some(date_of_sale),
                sold: Some(n % 2 == 0),
                category: Some(CATEGORIES[n % CATEGORIES.len()].to_owned()),
            });
        }

        month = month.next();
    }

    Ok(records)
}
