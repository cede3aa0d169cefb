//! Dashboard HTTP handlers.
//!
//! Each handler reads the transactions sold in the requested month once and
//! reduces them with the functions in [super::aggregation].

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    month_range::MonthQuery,
    transaction::{Transaction, TransactionFilter, get_transactions},
};

use super::aggregation::{
    CategoryCount, PriceRangeCount, Statistics, calculate_statistics, count_by_category,
    count_by_price_range,
};

/// The state needed for the dashboard endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Every dashboard view for a single month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedDashboard {
    /// Every transaction sold in the month.
    pub transactions: Vec<Transaction>,
    /// The totals for the month.
    pub statistics: Statistics,
    /// The number of transactions in each price range.
    pub bar_chart: Vec<PriceRangeCount>,
    /// The number of transactions in each category.
    pub pie_chart: Vec<CategoryCount>,
}

/// Get the total sales and the number of sold and unsold items in a month.
pub async fn get_statistics(
    State(state): State<DashboardState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Statistics>, Error> {
    let transactions = get_month_transactions(&state, &query)?;

    Ok(Json(calculate_statistics(&transactions)))
}

/// Get the number of transactions in each price range for a month.
pub async fn get_bar_chart(
    State(state): State<DashboardState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<PriceRangeCount>>, Error> {
    let transactions = get_month_transactions(&state, &query)?;

    Ok(Json(count_by_price_range(&transactions)))
}

/// Get the number of transactions in each category for a month.
pub async fn get_pie_chart(
    State(state): State<DashboardState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<CategoryCount>>, Error> {
    let transactions = get_month_transactions(&state, &query)?;

    Ok(Json(count_by_category(&transactions)))
}

/// Get the transactions, statistics, bar chart and pie chart for a month in
/// one response.
pub async fn get_combined(
    State(state): State<DashboardState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<CombinedDashboard>, Error> {
    let transactions = get_month_transactions(&state, &query)?;

    Ok(Json(CombinedDashboard {
        statistics: calculate_statistics(&transactions),
        bar_chart: count_by_price_range(&transactions),
        pie_chart: count_by_category(&transactions),
        transactions,
    }))
}

/// Resolve the month in `query` and read every transaction sold in it.
///
/// # Errors
/// Returns an:
/// - [Error::InvalidArgument] if the year or month is missing or invalid,
/// - [Error::DatabaseLockError] if the database lock is poisoned,
/// - or [Error::SqlError] if the query fails.
fn get_month_transactions(
    state: &DashboardState,
    query: &MonthQuery,
) -> Result<Vec<Transaction>, Error> {
    let range = query.resolve(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transactions(&TransactionFilter::month(range), None, &connection)
        .inspect_err(|error| tracing::error!("could not get transactions for month: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        db::initialize,
        month_range::MonthQuery,
        transaction::{Transaction, create_transaction},
    };

    use super::{DashboardState, get_bar_chart, get_combined, get_pie_chart, get_statistics};

    fn get_test_state() -> DashboardState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let march = datetime!(2022-03-20 8:00 UTC);
        let sales = [
            (50.0, true, "men's clothing"),
            (150.0, false, "electronics"),
            (999.0, true, "electronics"),
        ];
        for (price, sold, category) in sales {
            create_transaction(
                Transaction::build(price)
                    .date_of_sale(march)
                    .sold(sold)
                    .category(category),
                &conn,
            )
            .unwrap();
        }
        create_transaction(
            Transaction::build(500.0)
                .date_of_sale(datetime!(2022-04-01 0:00 UTC))
                .sold(true),
            &conn,
        )
        .unwrap();

        DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    fn month_query(year: &str, month: &str) -> Query<MonthQuery> {
        Query(MonthQuery {
            year: Some(year.to_owned()),
            month: Some(month.to_owned()),
        })
    }

    #[tokio::test]
    async fn statistics_only_include_month() {
        let state = get_test_state();

        let got = get_statistics(State(state), month_query("2022", "3"))
            .await
            .unwrap()
            .0;

        assert_eq!(got.total_sales, 1199.0);
        assert_eq!(got.sold_items, 2);
        assert_eq!(got.unsold_items, 1);
    }

    #[tokio::test]
    async fn bar_chart_has_every_price_range() {
        let state = get_test_state();

        let got = get_bar_chart(State(state), month_query("2022", "4"))
            .await
            .unwrap()
            .0;

        assert_eq!(got.len(), 10);
        assert_eq!(got[4].range, "401-500");
        assert_eq!(got[4].count, 1);
        assert_eq!(got.iter().map(|c| c.count).sum::<u64>(), 1);
    }

    #[tokio::test]
    async fn pie_chart_counts_categories() {
        let state = get_test_state();

        let got = get_pie_chart(State(state), month_query("2022", "3"))
            .await
            .unwrap()
            .0;

        let got: Vec<_> = got
            .iter()
            .map(|c| (c.category.as_deref(), c.count))
            .collect();
        assert_eq!(got, [(Some("men's clothing"), 1), (Some("electronics"), 2)]);
    }

    #[tokio::test]
    async fn combined_matches_individual_endpoints() {
        let state = get_test_state();

        let combined = get_combined(State(state.clone()), month_query("2022", "3"))
            .await
            .unwrap()
            .0;
        let statistics = get_statistics(State(state.clone()), month_query("2022", "3"))
            .await
            .unwrap()
            .0;
        let bar_chart = get_bar_chart(State(state.clone()), month_query("2022", "3"))
            .await
            .unwrap()
            .0;
        let pie_chart = get_pie_chart(State(state), month_query("2022", "3"))
            .await
            .unwrap()
            .0;

        assert_eq!(combined.transactions.len(), 3);
        assert_eq!(combined.statistics, statistics);
        assert_eq!(combined.bar_chart, bar_chart);
        assert_eq!(combined.pie_chart, pie_chart);
    }

    #[tokio::test]
    async fn invalid_month_is_rejected() {
        let state = get_test_state();

        let result = get_statistics(State(state), month_query("2022", "13")).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn poisoned_lock_is_store_failure() {
        let state = get_test_state();
        let connection = state.db_connection.clone();
        let _ = std::thread::spawn(move || {
            let _guard = connection.lock().unwrap();
            panic!("poison the database lock");
        })
        .join();

        let result = get_pie_chart(State(state), month_query("2022", "3")).await;

        assert!(matches!(result, Err(Error::DatabaseLockError)));
    }
}
