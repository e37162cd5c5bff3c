//! Defines the budget store trait.

use std::ops::RangeInclusive;

use time::Date;

use crate::{
    Error,
    models::{Budget, BudgetBuilder, BudgetPeriod, DatabaseID, UserID},
};

/// A partial update to a budget.
///
/// `None` fields keep their current value. The doubled option on the category
/// distinguishes "leave unchanged" (`None`) from "cover all spending"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetUpdate {
    /// Replace the display name of the budget.
    pub name: Option<String>,
    /// Replace the maximum amount to spend within the budget's window.
    pub amount: Option<f64>,
    /// Replace or clear the category of spending the budget covers.
    pub category_id: Option<Option<DatabaseID>>,
    /// Replace how long the budget's window runs for.
    pub period: Option<BudgetPeriod>,
    /// Replace the first day of the budget's window.
    pub start_date: Option<Date>,
    /// Replace the last day (inclusive) of the budget's window.
    pub end_date: Option<Date>,
    /// Replace whether the budget counts towards overviews and notifications.
    pub is_active: Option<bool>,
    /// Replace the percentage of the budget amount at which the user wants to
    /// be notified.
    pub notification_threshold: Option<u8>,
}

/// Handles the creation and retrieval of budgets.
pub trait BudgetStore {
    /// Create a new budget in the store.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NegativeAmount] if the budget amount is negative,
    /// - [Error::EndDateBeforeStart] if the end date falls before the start
    ///   date,
    /// - or [Error::InvalidCategory] if the builder's category does not
    ///   exist.
    fn create(&mut self, builder: BudgetBuilder) -> Result<Budget, Error>;

    /// Retrieve the budget with `id` belonging to `user_id`.
    fn get(&self, id: DatabaseID, user_id: UserID) -> Result<Budget, Error>;

    /// Retrieve all of a user's budgets.
    ///
    /// Deactivated budgets are only included when `include_inactive` is set.
    fn get_by_user(&self, user_id: UserID, include_inactive: bool) -> Result<Vec<Budget>, Error>;

    /// Retrieve the user's active budgets whose windows contain `date`.
    fn active_covering(&self, user_id: UserID, date: Date) -> Result<Vec<Budget>, Error>;

    /// Retrieve the user's budgets whose windows overlap `date_range`.
    ///
    /// Deactivated budgets are only included when `active_only` is unset.
    fn overlapping(
        &self,
        user_id: UserID,
        date_range: RangeInclusive<Date>,
        active_only: bool,
    ) -> Result<Vec<Budget>, Error>;

    /// Apply `update` to the budget with `id` belonging to `user_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UpdateMissingBudget] if the budget does not exist or belongs
    ///   to another user,
    /// - [Error::NegativeAmount] if the new amount is negative,
    /// - [Error::EndDateBeforeStart] if the new window would end before it
    ///   starts,
    /// - or [Error::InvalidCategory] if the new category does not exist.
    fn update(
        &mut self,
        id: DatabaseID,
        user_id: UserID,
        update: BudgetUpdate,
    ) -> Result<Budget, Error>;

    /// Mark the budget with `id` belonging to `user_id` inactive.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingBudget] if the budget does not exist or
    /// belongs to another user.
    fn deactivate(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error>;

    /// Delete the budget with `id` belonging to `user_id`.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingBudget] if the budget does not exist or
    /// belongs to another user.
    fn delete(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error>;
}
