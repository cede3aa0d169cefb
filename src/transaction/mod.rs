//! Transaction records for the sales dashboard.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, filtering and counting transactions
//! - The route handler for listing a page of transactions

mod core;
mod query;
mod transactions_endpoint;

pub use core::{
    Transaction, TransactionBuilder, count_transactions, create_transaction,
    create_transaction_table,
};
pub(crate) use query::{TransactionFilter, create_fold_case_function, get_transactions};
pub use transactions_endpoint::get_transactions_endpoint;
