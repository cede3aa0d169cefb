//! One-time import of transactions from an external JSON data source.
//!
//! The database is seeded the first time the server starts. A single-row
//! `initialization_status` table records that the import has completed so
//! later restarts keep the existing data instead of importing it again.

use std::{
    fmt::Display,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension, Transaction as SqlTransaction, TransactionBehavior};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, count_transactions, create_transaction},
};

/// The public product transaction dataset used when no other source is given.
pub const DEFAULT_SEED_URL: &str = "https://s3.amazonaws.com/roxiler.com/product_transaction.json";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to read the seed data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    /// An HTTP(S) URL that responds with a JSON array of transactions.
    Url(String),
    /// A local file containing a JSON array of transactions.
    File(PathBuf),
}

impl Display for SeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedSource::Url(url) => write!(f, "{url}"),
            SeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A transaction as it appears in the seed data.
///
/// Only `price` is required. Keys other than those below, such as the
/// source's own `id` or `image`, are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    /// The name of the product.
    pub title: Option<String>,
    /// A text description of the product.
    pub description: Option<String>,
    /// The listed price of the product.
    pub price: f64,
    /// When the product was sold, as an RFC 3339 timestamp.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_of_sale: Option<OffsetDateTime>,
    /// Whether the product has been sold.
    pub sold: Option<bool>,
    /// The category of the product.
    pub category: Option<String>,
}

impl From<SeedRecord> for TransactionBuilder {
    fn from(record: SeedRecord) -> Self {
        TransactionBuilder {
            title: record.title,
            description: record.description,
            date_of_sale: record.date_of_sale,
            sold: record.sold,
            category: record.category,
            ..Transaction::build(record.price)
        }
    }
}

/// What [ensure_seeded] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The database had already been seeded, nothing was imported.
    AlreadyInitialized,
    /// The database was seeded with this many transactions.
    Seeded(usize),
}

/// Seed the database from `source` unless it has already been seeded.
///
/// Set `force` to replace the existing transactions even if the database has
/// already been seeded. This should run once before the server accepts requests.
///
/// # Errors
/// Returns an:
/// - [Error::UpstreamUnavailable] if the source cannot be read or is not a
///   JSON array of transactions, in which case the database is left unchanged,
/// - [Error::DatabaseLockError] if the database lock is poisoned,
/// - or [Error::SqlError] if the transactions cannot be saved.
pub async fn ensure_seeded(
    source: &SeedSource,
    db_connection: &Arc<Mutex<Connection>>,
    force: bool,
) -> Result<SeedOutcome, Error> {
    if !force {
        let initialized = {
            let connection = lock(db_connection)?;

            if is_initialized(&connection)? {
                Some(count_transactions(&connection)?)
            } else {
                None
            }
        };

        if let Some(count) = initialized {
            tracing::info!("Database already initialized with {count} transactions");
            return Ok(SeedOutcome::AlreadyInitialized);
        }
    }

    tracing::info!("Fetching seed data from {source}...");
    let records = fetch_seed_records(source).await?;
    tracing::info!("Fetched {} records", records.len());

    let connection = lock(db_connection)?;
    let count = replace_transactions(records, &connection)?;
    tracing::info!("Database initialized with {count} transactions");

    Ok(SeedOutcome::Seeded(count))
}

fn lock(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

/// Read and parse the seed records from `source`.
///
/// # Errors
/// Returns an [Error::UpstreamUnavailable] if the source cannot be read or
/// does not contain a JSON array of transactions.
pub async fn fetch_seed_records(source: &SeedSource) -> Result<Vec<SeedRecord>, Error> {
    let json = match source {
        SeedSource::Url(url) => fetch_url(url).await?,
        SeedSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|error| {
            Error::UpstreamUnavailable(format!("could not read {}: {error}", path.display()))
        })?,
    };

    parse_seed_records(&json)
}

async fn fetch_url(url: &str) -> Result<String, Error> {
    let upstream_error = |error: reqwest::Error| Error::UpstreamUnavailable(error.to_string());

    let client = reqwest::Client::builder()
        .user_agent(format!("sales_dashboard_rs/{}", env!("CARGO_PKG_VERSION")))
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(upstream_error)?;

    client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(upstream_error)?
        .text()
        .await
        .map_err(upstream_error)
}

/// Parse seed data, which must be a JSON array of transaction objects.
///
/// # Errors
/// Returns an [Error::UpstreamUnavailable] if `json` is not an array of
/// objects that each have a numeric `price`.
pub fn parse_seed_records(json: &str) -> Result<Vec<SeedRecord>, Error> {
    serde_json::from_str(json).map_err(|error| {
        Error::UpstreamUnavailable(format!("invalid data structure from seed source: {error}"))
    })
}

/// Replace every transaction in the database with `records` and mark the
/// database as seeded.
///
/// The replacement happens in a single database transaction, so on error the
/// existing transactions are kept.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn replace_transactions(
    records: Vec<SeedRecord>,
    connection: &Connection,
) -> Result<usize, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let deleted = transaction.execute("DELETE FROM \"transaction\"", ())?;
    tracing::debug!("Deleted {deleted} existing transactions");

    let count = records.len();
    for record in records {
        create_transaction(record.into(), &transaction)?;
    }

    mark_initialized(&transaction)?;
    transaction.commit()?;

    Ok(count)
}

/// Whether the database has been seeded.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn is_initialized(connection: &Connection) -> Result<bool, Error> {
    let initialized = connection
        .query_row(
            "SELECT initialized FROM initialization_status WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(initialized.unwrap_or(false))
}

fn mark_initialized(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT INTO initialization_status (id, initialized) VALUES (1, 1)
         ON CONFLICT(id) DO UPDATE SET initialized = excluded.initialized",
        (),
    )?;

    Ok(())
}

/// Create the table that records whether the database has been seeded.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_initialization_status_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS initialization_status (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                initialized INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}
