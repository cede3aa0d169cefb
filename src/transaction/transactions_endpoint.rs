//! Defines the route handler for listing a page of a month's transactions.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    month_range::resolve_query,
    pagination::{PageWindow, PaginationConfig},
};

use super::{
    core::Transaction,
    query::{TransactionFilter, count_matching_transactions, get_transactions},
};

/// The query parameters for the transactions endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    /// The year, e.g. "2022".
    pub year: Option<String>,
    /// The month number, "1" for January through "12" for December.
    pub month: Option<String>,
    /// Text to look for in the title or description, or a price.
    pub search: Option<String>,
    /// The one-based page number.
    pub page: Option<String>,
    /// The number of transactions per page.
    pub per_page: Option<String>,
}

/// A page of transactions and the number of transactions across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    /// The transactions on the requested page.
    pub transactions: Vec<Transaction>,
    /// The number of transactions matching the query across all pages.
    pub total_count: u64,
}

/// The state needed for the transactions endpoint.
#[derive(Debug, Clone)]
pub struct TransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The config that controls the default page.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Get a page of the transactions sold in a month, optionally narrowed by a search.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionsState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsPage>, Error> {
    let range = resolve_query(
        query.year.as_deref(),
        query.month.as_deref(),
        &state.local_timezone,
    )?;
    let window = PageWindow::parse(
        query.page.as_deref(),
        query.per_page.as_deref(),
        &state.pagination_config,
    )?;
    let filter = TransactionFilter::month(range).with_search(query.search.as_deref().unwrap_or(""));

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_transactions(&filter, Some(window), &connection)
        .inspect_err(|error| tracing::error!("could not get transactions: {error}"))?;
    let total_count = count_matching_transactions(&filter, &connection)
        .inspect_err(|error| tracing::error!("could not count transactions: {error}"))?;

    Ok(Json(TransactionsPage {
        transactions,
        total_count,
    }))
}
