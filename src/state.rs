//! Implements a struct that holds the stores shared across the application.

use std::{
    marker::{Send, Sync},
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::stores::{BudgetStore, CategoryStore, ScheduleStore, TransactionStore};

/// The shared state of the application.
#[derive(Debug, Clone)]
pub struct AppState<T, S, C, B>
where
    T: TransactionStore + Send + Sync,
    S: ScheduleStore + Send + Sync,
    C: CategoryStore + Send + Sync,
    B: BudgetStore + Send + Sync,
{
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
    /// The store for managing user [transactions](crate::models::Transaction).
    pub transaction_store: T,
    /// The store for managing the schedules of recurring transactions.
    pub schedule_store: S,
    /// The store for managing user [categories](crate::models::Category).
    pub category_store: C,
    /// The store for managing user [budgets](crate::models::Budget).
    pub budget_store: B,
}

impl<T, S, C, B> AppState<T, S, C, B>
where
    T: TransactionStore + Send + Sync,
    S: ScheduleStore + Send + Sync,
    C: CategoryStore + Send + Sync,
    B: BudgetStore + Send + Sync,
{
    /// Create a new [AppState].
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        transaction_store: T,
        schedule_store: S,
        category_store: C,
        budget_store: B,
    ) -> Self {
        Self {
            db_connection,
            transaction_store,
            schedule_store,
            category_store,
            budget_store,
        }
    }
}
