//! Dashboard module
//!
//! Provides the summary statistics and chart data for a month of sales.

mod aggregation;
mod handlers;

pub use handlers::{get_bar_chart, get_combined, get_pie_chart, get_statistics};
