//! Transaction data aggregation for the dashboard.
//!
//! Provides single-pass reductions over a month's transactions: summary
//! statistics, counts per price range and counts per category.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Totals for the transactions in a month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// The sum of the price of every transaction, sold or not.
    pub total_sales: f64,
    /// The number of transactions that have been sold.
    pub sold_items: u64,
    /// The number of transactions that have not been sold.
    pub unsold_items: u64,
}

/// The number of transactions whose price falls in a price range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRangeCount {
    /// The label of the price range, e.g. "101-200".
    pub range: String,
    /// The number of transactions in the price range.
    pub count: u64,
}

/// The number of transactions in a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category name, `None` for transactions without a category.
    pub category: Option<String>,
    /// The number of transactions in the category.
    pub count: u64,
}

/// A labelled price range with an inclusive upper bound.
struct PriceBucket {
    label: &'static str,
    /// `None` for the last, unbounded, range.
    upper: Option<f64>,
}

/// The price ranges of the bar chart, in ascending order.
///
/// The labels read as closed integer ranges ("0-100", "101-200", ...). A price
/// belongs to the first range whose upper bound it does not exceed, so
/// fractional prices between two labels, e.g. 100.5, go to the higher range
/// rather than to no range at all.
const PRICE_BUCKETS: [PriceBucket; 10] = [
    PriceBucket {
        label: "0-100",
        upper: Some(100.0),
    },
    PriceBucket {
        label: "101-200",
        upper: Some(200.0),
    },
    PriceBucket {
        label: "201-300",
        upper: Some(300.0),
    },
    PriceBucket {
        label: "301-400",
        upper: Some(400.0),
    },
    PriceBucket {
        label: "401-500",
        upper: Some(500.0),
    },
    PriceBucket {
        label: "501-600",
        upper: Some(600.0),
    },
    PriceBucket {
        label: "601-700",
        upper: Some(700.0),
    },
    PriceBucket {
        label: "701-800",
        upper: Some(800.0),
    },
    PriceBucket {
        label: "801-900",
        upper: Some(900.0),
    },
    PriceBucket {
        label: "901-above",
        upper: None,
    },
];

/// Sum the prices and count the sold and unsold transactions.
///
/// Transactions where `sold` is unknown are counted as neither sold nor unsold.
pub(crate) fn calculate_statistics(transactions: &[Transaction]) -> Statistics {
    let mut statistics = Statistics {
        total_sales: 0.0,
        sold_items: 0,
        unsold_items: 0,
    };

    for transaction in transactions {
        statistics.total_sales += transaction.price;

        match transaction.sold {
            Some(true) => statistics.sold_items += 1,
            Some(false) => statistics.unsold_items += 1,
            None => {}
        }
    }

    statistics
}

/// The index into [PRICE_BUCKETS] for `price`, or `None` for negative or NaN prices.
fn price_bucket_index(price: f64) -> Option<usize> {
    if price.is_nan() || price < 0.0 {
        return None;
    }

    PRICE_BUCKETS
        .iter()
        .position(|bucket| bucket.upper.is_none_or(|upper| price <= upper))
}

/// Count the transactions in each price range.
///
/// Every price range is returned in ascending order, including those with a
/// count of zero. Transactions with a negative price are not counted.
pub(crate) fn count_by_price_range(transactions: &[Transaction]) -> Vec<PriceRangeCount> {
    let mut counts = [0u64; PRICE_BUCKETS.len()];

    for transaction in transactions {
        match price_bucket_index(transaction.price) {
            Some(index) => counts[index] += 1,
            None => tracing::debug!(
                "transaction {} has price {} outside of every price range",
                transaction.id,
                transaction.price
            ),
        }
    }

    PRICE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(bucket, count)| PriceRangeCount {
            range: bucket.label.to_owned(),
            count,
        })
        .collect()
}

/// Count the transactions in each category.
///
/// Categories are listed in the order they first appear in `transactions`.
/// Transactions without a category are grouped together under `None`.
pub(crate) fn count_by_category(transactions: &[Transaction]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut index_by_category: HashMap<Option<&str>, usize> = HashMap::new();

    for transaction in transactions {
        let category = transaction.category.as_deref();

        match index_by_category.get(&category) {
            Some(&index) => counts[index].count += 1,
            None => {
                index_by_category.insert(category, counts.len());
                counts.push(CategoryCount {
                    category: category.map(str::to_owned),
                    count: 1,
                });
            }
        }
    }

    counts
}
