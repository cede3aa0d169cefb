//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// The sale of a product, i.e. a listing that has either been sold or is still
/// for sale.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The name of the product.
    pub title: Option<String>,
    /// A text description of the product.
    pub description: Option<String>,
    /// The listed price of the product.
    pub price: f64,
    /// When the product was sold, or listed if it has not sold yet.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_of_sale: Option<OffsetDateTime>,
    /// Whether the product has been sold.
    pub sold: Option<bool>,
    /// The category of the product, e.g. "electronics", "jewelery".
    pub category: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(price: f64) -> TransactionBuilder {
        TransactionBuilder {
            price,
            title: None,
            description: None,
            date_of_sale: None,
            sold: None,
            category: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Only the price is required, every other field defaults to `None`. The ID is
/// assigned by the database when the transaction is created.
///
/// # Examples
///
/// ```ignore
/// use time::macros::datetime;
///
/// use crate::transaction::Transaction;
///
/// let builder = Transaction::build(329.85)
///     .title("Mens Casual Premium Slim Fit T-Shirts")
///     .date_of_sale(datetime!(2022-03-27 20:29:54 +5:30))
///     .sold(true)
///     .category("men's clothing");
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The listed price of the product.
    pub price: f64,
    /// The name of the product.
    pub title: Option<String>,
    /// A text description of the product.
    pub description: Option<String>,
    /// When the product was sold.
    ///
    /// Stored with second precision in UTC, the original offset is not kept.
    pub date_of_sale: Option<OffsetDateTime>,
    /// Whether the product has been sold.
    pub sold: Option<bool>,
    /// The category of the product.
    pub category: Option<String>,
}

impl TransactionBuilder {
    /// Set the title for the transaction.
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Set the date of sale for the transaction.
    pub fn date_of_sale(mut self, date_of_sale: OffsetDateTime) -> Self {
        self.date_of_sale = Some(date_of_sale);
        self
    }

    /// Set whether the product has been sold.
    pub fn sold(mut self, sold: bool) -> Self {
        self.sold = Some(sold);
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_owned());
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns selected by queries that return a [Transaction], in the order
/// expected by [map_transaction_row].
pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, title, description, price, date_of_sale, sold, category";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (title, description, price, date_of_sale, sold, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                builder.title,
                builder.description,
                builder.price,
                builder.date_of_sale.map(OffsetDateTime::unix_timestamp),
                builder.sold,
                builder.category,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u64, Error> {
    let count: i64 =
        connection.query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })?;

    Ok(count as u64)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                description TEXT,
                price REAL NOT NULL,
                date_of_sale INTEGER,
                sold INTEGER,
                category TEXT
                )",
        (),
    )?;

    // Every dashboard query filters on the month of sale.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date_of_sale ON \"transaction\"(date_of_sale);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let date_of_sale = row
        .get::<usize, Option<i64>>(4)?
        .map(OffsetDateTime::from_unix_timestamp)
        .transpose()
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(error))
        })?;

    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        date_of_sale,
        sold: row.get(5)?,
        category: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
