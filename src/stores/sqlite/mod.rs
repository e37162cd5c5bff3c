//! Contains convenience type alias and function for [AppState] that uses
//! the SQLite backend.

pub mod budget;
pub mod category;
pub mod schedule;
pub mod transaction;

pub use budget::SQLiteBudgetStore;
pub use category::SQLiteCategoryStore;
pub use schedule::SQLiteScheduleStore;
pub use transaction::SQLiteTransactionStore;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{AppState, Error, db::initialize};

/// An alias for an [AppState] that uses SQLite for the backend.
pub type SQLAppState = AppState<
    SQLiteTransactionStore,
    SQLiteScheduleStore,
    SQLiteCategoryStore,
    SQLiteBudgetStore,
>;

/// Creates an [AppState] instance that uses SQLite for the backend.
///
/// This function will modify the database by adding the tables for the domain
/// models to the database.
pub fn create_app_state(db_connection: Connection) -> Result<SQLAppState, Error> {
    initialize(&db_connection)?;

    let connection = Arc::new(Mutex::new(db_connection));
    let transaction_store = SQLiteTransactionStore::new(connection.clone());
    let schedule_store = SQLiteScheduleStore::new(connection.clone());
    let category_store = SQLiteCategoryStore::new(connection.clone());
    let budget_store = SQLiteBudgetStore::new(connection.clone());

    Ok(AppState::new(
        connection,
        transaction_store,
        schedule_store,
        category_store,
        budget_store,
    ))
}
