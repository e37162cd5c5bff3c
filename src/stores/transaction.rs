//! Defines the transaction store trait.

use std::ops::RangeInclusive;

use time::Date;

use crate::{
    Error,
    models::{DatabaseID, Direction, Ledger, Transaction, TransactionBuilder, UserID},
};

/// Handles the creation and retrieval of transactions.
pub trait TransactionStore {
    /// Create a new transaction in the store.
    ///
    /// When the builder carries a recurrence rule, the stored transaction
    /// becomes a template: it is the first occurrence of the series and
    /// carries a cursor pointing at the next date the series is due.
    fn create(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error>;

    /// Retrieve a transaction from the store.
    fn get(&self, id: DatabaseID) -> Result<Transaction, Error>;

    /// Retrieve transactions from the store in the way defined by `query`.
    fn get_query(&self, query: TransactionQuery) -> Result<Vec<Transaction>, Error>;

    /// Sum the amounts of the transactions matching `query`.
    ///
    /// Returns zero when no transactions match. The `limit` and `sort_date`
    /// fields of the query are ignored.
    fn sum_amount(&self, query: TransactionQuery) -> Result<f64, Error>;

    /// The distinct calendar years, in increasing order, in which `user_id`
    /// has transactions on the `ledger` ledger.
    fn available_years(&self, user_id: UserID, ledger: Ledger) -> Result<Vec<i32>, Error>;

    /// Delete the transaction with `id` belonging to `user_id`.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingTransaction] if the transaction does not
    /// exist or belongs to another user.
    fn delete(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error>;
}

/// Defines how transactions should be fetched from [TransactionStore::get_query].
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Include transactions belonging to the user.
    pub user_id: Option<UserID>,
    /// Include transactions on one ledger (expense or income).
    pub ledger: Option<Ledger>,
    /// Include transactions with one direction (debit or credit).
    pub direction: Option<Direction>,
    /// Include transactions assigned to the category.
    pub category_id: Option<DatabaseID>,
    /// Include transactions within `date_range` (inclusive).
    pub date_range: Option<RangeInclusive<Date>>,
    /// Selects up to the first N (`limit`) transactions.
    pub limit: Option<u64>,
    /// Orders transactions by date in the order `sort_date`. None returns transactions in the
    /// order they are stored.
    pub sort_date: Option<SortOrder>,
}

/// The order to sort transactions in a [TransactionQuery].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}
