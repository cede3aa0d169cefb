//! The API endpoints URIs.
//!
//! Every endpoint is served both under [API_PREFIX] and at the root, e.g.
//! `/api/statistics` and `/statistics`.

/// The prefix for the API routes.
pub const API_PREFIX: &str = "/api";
/// The route for a page of a month's transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route for the total sales and sold/unsold counts of a month.
pub const STATISTICS: &str = "/statistics";
/// The route for the number of transactions per price range in a month.
pub const BAR_CHART: &str = "/bar-chart";
/// The route for the number of transactions per category in a month.
pub const PIE_CHART: &str = "/pie-chart";
/// The route for all of a month's dashboard views in one response.
pub const COMBINED: &str = "/combined";
