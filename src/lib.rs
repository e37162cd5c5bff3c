//! Money Tracker is a library for managing personal finances.
//!
//! It keeps a ledger of expense and income transactions, materializes the
//! transactions that schedule templates generate on a recurring basis, and
//! reports budget and cash-flow performance over time.

#![warn(missing_docs)]

use time::Date;

use crate::models::{Frequency, Ledger};

pub mod db;
pub mod models;
pub mod reports;
pub mod scheduler;
mod state;
pub mod stores;

pub use db::initialize as initialize_db;
pub use scheduler::{ScheduleRun, process_due_templates};
pub use state::AppState;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A negative amount was used to create a transaction or budget.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(f64),

    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed. Schedule templates are exempt since their date
    /// marks when the series takes effect.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The user already has a category with this name.
    #[error("a category with this name already exists")]
    DuplicateCategoryName,

    /// A day of the month outside 1-31 was used to anchor a monthly schedule.
    #[error("{0} is not a valid day of the month")]
    InvalidAnchorDay(u8),

    /// A schedule or budget ended on or before the date it took effect.
    #[error("the end date {end} is not after the start date {start}")]
    EndDateBeforeStart {
        /// The date the schedule or budget takes effect.
        start: Date,
        /// The offending end date.
        end: Date,
    },

    /// The frequency is not available for the transaction's ledger, e.g. a
    /// daily income schedule.
    #[error("{frequency} schedules are not available for {ledger} transactions")]
    FrequencyNotAvailable {
        /// The requested frequency.
        frequency: Frequency,
        /// The ledger the transaction belongs to.
        ledger: Ledger,
    },

    /// A debit/credit direction was set on an income transaction.
    #[error("income transactions do not have a debit/credit direction")]
    DirectionOnIncome,

    /// A category was set on an income transaction.
    #[error("income transactions cannot be categorised")]
    CategoryOnIncome,

    /// The category ID used to create a transaction or budget did not match a
    /// valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory,

    /// The transaction does not have a recurrence schedule attached.
    #[error("the transaction is not a schedule template")]
    NotRecurring,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.ends_with("category.name, category.user_id") =>
            {
                Error::DuplicateCategoryName
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
