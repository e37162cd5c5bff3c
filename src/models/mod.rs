//! This module defines the domain data types.

use serde::{Deserialize, Serialize};

pub use budget::{Budget, BudgetBuilder, BudgetPeriod, BudgetPeriodError};
pub use category::{Category, CategoryName};
pub use recurrence::{Frequency, FrequencyError, Recurrence, RecurrenceRule};
pub use transaction::{
    Direction, DirectionError, Ledger, LedgerError, Transaction, TransactionBuilder,
};

pub(crate) use recurrence::last_day_of_month;

mod budget;
mod category;
mod recurrence;
mod transaction;

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;

/// The ID of the user that owns a record.
///
/// There is no user table behind this ID. It scopes records so that the
/// library can keep several people's ledgers in one database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The integer form of the user ID for database queries.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}
