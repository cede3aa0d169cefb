//! Application router configuration.

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    dashboard::{get_bar_chart, get_combined, get_pie_chart, get_statistics},
    endpoints,
    transaction::get_transactions_endpoint,
};

/// Return a router with all the app's routes.
///
/// The API routes are served under [endpoints::API_PREFIX] and at the root.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(endpoints::STATISTICS, get(get_statistics))
        .route(endpoints::BAR_CHART, get(get_bar_chart))
        .route(endpoints::PIE_CHART, get(get_pie_chart))
        .route(endpoints::COMBINED, get(get_combined));

    Router::new()
        .nest(endpoints::API_PREFIX, api_routes.clone())
        .merge(api_routes)
        .fallback(get_404_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        AppState,
        pagination::PaginationConfig,
        transaction::{Transaction, create_transaction},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn, "Etc/UTC", PaginationConfig::default()).unwrap();

        {
            let conn = state.db_connection.lock().unwrap();
            let sales = [
                (50.0, true, "men's clothing", "Slim fit cotton shirt"),
                (150.0, false, "electronics", "Wireless headphones"),
                (999.0, true, "electronics", "4K television"),
            ];
            for (price, sold, category, title) in sales {
                create_transaction(
                    Transaction::build(price)
                        .title(title)
                        .date_of_sale(datetime!(2022-03-15 12:00 UTC))
                        .sold(sold)
                        .category(category),
                    &conn,
                )
                .unwrap();
            }
        }

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn statistics_for_example_month() {
        let server = get_test_server();

        let response = server.get("/statistics?year=2022&month=3").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "totalSales": 1199.0,
            "soldItems": 2,
            "unsoldItems": 1,
        }));
    }

    #[tokio::test]
    async fn api_prefix_serves_same_routes() {
        let server = get_test_server();

        let prefixed = server.get("/api/pie-chart?year=2022&month=3").await;
        let bare = server.get("/pie-chart?year=2022&month=3").await;

        prefixed.assert_status_ok();
        bare.assert_status_ok();
        assert_eq!(prefixed.json::<Value>(), bare.json::<Value>());
    }

    #[tokio::test]
    async fn transactions_page_has_total_count() {
        let server = get_test_server();

        let response = server
            .get("/api/transactions?year=2022&month=3&search=ELECTRONICS&page=1&perPage=1")
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["totalCount"], 0);

        let response = server
            .get("/api/transactions?year=2022&month=3&search=wireless&page=1&perPage=1")
            .await;
        let body = response.json::<Value>();
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["transactions"][0]["title"], "Wireless headphones");
        assert_eq!(body["transactions"][0]["dateOfSale"], "2022-03-15T12:00:00Z");
    }

    #[tokio::test]
    async fn missing_year_is_bad_request() {
        let server = get_test_server();

        let response = server.get("/statistics?month=3").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn month_out_of_range_is_bad_request() {
        let server = get_test_server();

        for month in ["0", "13", "March"] {
            server
                .get(&format!("/api/bar-chart?year=2022&month={month}"))
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn invalid_page_is_bad_request() {
        let server = get_test_server();

        server
            .get("/transactions?year=2022&month=3&page=0")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/transactions?year=2022&month=3&perPage=-5")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        let response = server.get("/api/coffee").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn combined_matches_individual_endpoints() {
        let server = get_test_server();
        let query = "?year=2022&month=3";

        let combined = server.get(&format!("/combined{query}")).await.json::<Value>();
        let statistics = server.get(&format!("/statistics{query}")).await.json::<Value>();
        let bar_chart = server.get(&format!("/bar-chart{query}")).await.json::<Value>();
        let pie_chart = server.get(&format!("/pie-chart{query}")).await.json::<Value>();

        assert_eq!(combined["statistics"], statistics);
        assert_eq!(combined["barChart"], bar_chart);
        assert_eq!(combined["pieChart"], pie_chart);
        assert_eq!(combined["transactions"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn empty_month_has_zeroed_views() {
        let server = get_test_server();

        let combined = server.get("/combined?year=2021&month=12").await.json::<Value>();

        assert_eq!(combined["transactions"], json!([]));
        assert_eq!(
            combined["statistics"],
            json!({ "totalSales": 0.0, "soldItems": 0, "unsoldItems": 0 })
        );
        assert_eq!(combined["barChart"].as_array().map(Vec::len), Some(10));
        assert_eq!(combined["pieChart"], json!([]));
    }
}
