//! Filtered retrieval and counting of transactions.
//!
//! A [TransactionFilter] restricts transactions to a month and optionally to a
//! search term. The same filter is translated into one SQL `WHERE` clause for
//! both the page query and the count query so the total always agrees with
//! the pages.

use rusqlite::{Connection, functions::FunctionFlags, named_params};

use crate::{Error, month_range::MonthRange, pagination::PageWindow};

use super::core::{TRANSACTION_COLUMNS, Transaction, map_transaction_row};

/// How far a stored price may be from a numeric search term and still match.
pub(crate) const PRICE_TOLERANCE: f64 = 0.01;

/// Slack added to [PRICE_TOLERANCE] so that prices exactly one cent away
/// still match after floating point rounding, e.g. 329.84 for "329.85".
const PRICE_EPSILON: f64 = 1e-9;

/// A search over the title, description and price of transactions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchTerm {
    /// A `LIKE` pattern that matches text containing the search term.
    pattern: String,
    /// The inclusive price range matched when the search term is a number.
    price_range: Option<(f64, f64)>,
}

impl SearchTerm {
    /// Create a search from the raw text entered by the user.
    ///
    /// Returns `None` for empty text, which matches every transaction.
    pub(crate) fn new(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        let price_range = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .map(|price| {
                let tolerance = PRICE_TOLERANCE + PRICE_EPSILON;
                (price - tolerance, price + tolerance)
            });

        Some(Self {
            pattern: format!("%{}%", escape_like(&text.to_lowercase())),
            price_range,
        })
    }
}

/// Escape the `LIKE` wildcards in `text` so that they match literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// The predicate selecting transactions for a query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransactionFilter {
    /// Only transactions sold within this month match.
    pub range: MonthRange,
    /// If set, transactions must also match the search.
    pub search: Option<SearchTerm>,
}

impl TransactionFilter {
    /// A filter matching every transaction in `range`.
    pub(crate) fn month(range: MonthRange) -> Self {
        Self {
            range,
            search: None,
        }
    }

    /// Add a search to the filter, an empty `text` leaves the filter unchanged.
    pub(crate) fn with_search(self, text: &str) -> Self {
        Self {
            search: SearchTerm::new(text),
            ..self
        }
    }
}

const FILTER_CLAUSE: &str = "date_of_sale >= :start AND date_of_sale < :end \
    AND (:pattern IS NULL \
        OR fold_case(title) LIKE :pattern ESCAPE '\\' \
        OR fold_case(description) LIKE :pattern ESCAPE '\\' \
        OR (:min_price IS NOT NULL AND price BETWEEN :min_price AND :max_price))";

/// Register the SQL function used by search to fold the case of text.
///
/// SQLite's `LIKE` only ignores the case of ASCII letters, so both the search
/// pattern and the searched columns are lowercased in full before comparing.
/// The function must be registered on every connection that runs a search.
///
/// # Errors
/// Returns an error if the function cannot be registered.
pub(crate) fn create_fold_case_function(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text: Option<String> = context.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}

/// Get the transactions matching `filter` in insertion order.
///
/// If `window` is `None` every matching transaction is returned, otherwise
/// only those on the page described by `window`.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub(crate) fn get_transactions(
    filter: &TransactionFilter,
    window: Option<PageWindow>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (limit, offset) = match window {
        Some(window) => (window.limit(), window.offset()),
        // SQLite treats a negative limit as no limit.
        None => (-1, 0),
    };
    let search = filter.search.as_ref();
    let price_range = search.and_then(|search| search.price_range);

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" \
        WHERE {FILTER_CLAUSE} \
        ORDER BY id ASC \
        LIMIT :limit OFFSET :offset"
    );

    connection
        .prepare(&query)?
        .query_map(
            named_params! {
                ":start": filter.range.start.unix_timestamp(),
                ":end": filter.range.end.unix_timestamp(),
                ":pattern": search.map(|search| search.pattern.as_str()),
                ":min_price": price_range.map(|(min, _)| min),
                ":max_price": price_range.map(|(_, max)| max),
                ":limit": limit,
                ":offset": offset,
            },
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Count the transactions matching `filter`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub(crate) fn count_matching_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let search = filter.search.as_ref();
    let price_range = search.and_then(|search| search.price_range);

    let count: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {FILTER_CLAUSE}"),
        named_params! {
            ":start": filter.range.start.unix_timestamp(),
            ":end": filter.range.end.unix_timestamp(),
            ":pattern": search.map(|search| search.pattern.as_str()),
            ":min_price": price_range.map(|(min, _)| min),
            ":max_price": price_range.map(|(_, max)| max),
        },
        |row| row.get(0),
    )?;

    Ok(count as u64)
}
