//! This file defines the `Budget` type, a spending limit over a window of
//! dates, and the builder used to create new budgets.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    Error,
    models::{DatabaseID, Frequency, UserID, last_day_of_month},
};

/// The error returned when a period code from the database does not map to a
/// known budget period.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a valid budget period code")]
pub struct BudgetPeriodError(pub i64);

/// How long a budget's window runs for when no explicit end date is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetPeriod {
    /// The rest of the calendar month the budget starts in.
    Monthly,
    /// Ninety days from the start date.
    Quarterly,
    /// One year from the start date.
    Yearly,
}

impl BudgetPeriod {
    /// The integer code the period is stored under in the database.
    pub fn code(&self) -> i64 {
        match self {
            BudgetPeriod::Monthly => 0,
            BudgetPeriod::Quarterly => 1,
            BudgetPeriod::Yearly => 2,
        }
    }

    /// The last day (inclusive) of one period starting at `start`.
    pub fn default_end_date(&self, start: Date) -> Date {
        match self {
            BudgetPeriod::Monthly => Date::from_calendar_date(
                start.year(),
                start.month(),
                last_day_of_month(start.year(), start.month()),
            )
            .expect("invalid month end date"),
            BudgetPeriod::Quarterly => start.saturating_add(Duration::days(90)),
            BudgetPeriod::Yearly => Frequency::Yearly
                .next_occurrence(start)
                .previous_day()
                .expect("invalid year end date"),
        }
    }
}

impl TryFrom<i64> for BudgetPeriod {
    type Error = BudgetPeriodError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BudgetPeriod::Monthly),
            1 => Ok(BudgetPeriod::Quarterly),
            2 => Ok(BudgetPeriod::Yearly),
            _ => Err(BudgetPeriodError(value)),
        }
    }
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetPeriod::Monthly => write!(f, "monthly"),
            BudgetPeriod::Quarterly => write!(f, "quarterly"),
            BudgetPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

/// A spending limit over a window of dates, either for one category of
/// spending or for all of a user's spending.
///
/// To create a new budget, use [BudgetBuilder] and finalize it with
/// [BudgetStore::create](crate::stores::BudgetStore::create).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    id: DatabaseID,
    name: String,
    amount: f64,
    category_id: Option<DatabaseID>,
    period: BudgetPeriod,
    start_date: Date,
    end_date: Date,
    user_id: UserID,
    is_active: bool,
    notification_threshold: u8,
}

impl Budget {
    /// Reassemble a budget from its database form.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the budget invariants are violated it will cause incorrect behaviour
    /// but not affect memory safety.
    #[allow(clippy::too_many_arguments)]
    pub fn new_unchecked(
        id: DatabaseID,
        name: String,
        amount: f64,
        category_id: Option<DatabaseID>,
        period: BudgetPeriod,
        start_date: Date,
        end_date: Date,
        user_id: UserID,
        is_active: bool,
        notification_threshold: u8,
    ) -> Self {
        Self {
            id,
            name,
            amount,
            category_id,
            period,
            start_date,
            end_date,
            user_id,
            is_active,
            notification_threshold,
        }
    }

    /// The ID of the budget.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The display name of the budget.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The maximum amount to spend within the budget's window.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The category of spending the budget covers, or `None` for a budget
    /// that covers all spending.
    pub fn category_id(&self) -> Option<DatabaseID> {
        self.category_id
    }

    /// How long the budget's window runs for.
    pub fn period(&self) -> BudgetPeriod {
        self.period
    }

    /// The first day of the budget's window.
    pub fn start_date(&self) -> Date {
        self.start_date
    }

    /// The last day (inclusive) of the budget's window.
    pub fn end_date(&self) -> Date {
        self.end_date
    }

    /// The ID of the user that owns the budget.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// Whether the budget counts towards overviews and notifications.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The percentage of the budget amount at which the user wants to be
    /// notified.
    pub fn notification_threshold(&self) -> u8 {
        self.notification_threshold
    }
}

/// Builder for creating a new [Budget].
///
/// Finalize the builder with
/// [BudgetStore::create](crate::stores::BudgetStore::create).
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetBuilder {
    /// The display name of the budget.
    pub name: String,
    /// The maximum amount to spend within the budget's window.
    pub amount: f64,
    /// The category of spending the budget covers. `None` covers all
    /// spending.
    pub category_id: Option<DatabaseID>,
    /// How long the budget's window runs for.
    pub period: BudgetPeriod,
    /// The first day of the budget's window. Defaults to the first day of the
    /// current month.
    pub start_date: Option<Date>,
    /// The last day (inclusive) of the budget's window. Defaults to the end
    /// of one period after the start date.
    pub end_date: Option<Date>,
    /// The user that owns the budget.
    pub user_id: UserID,
    /// The percentage of the budget amount at which the user wants to be
    /// notified. Defaults to 80.
    pub notification_threshold: u8,
}

impl BudgetBuilder {
    /// Create a new budget builder.
    pub fn new(name: &str, amount: f64, period: BudgetPeriod, user_id: UserID) -> Self {
        Self {
            name: name.to_string(),
            amount,
            category_id: None,
            period,
            start_date: None,
            end_date: None,
            user_id,
            notification_threshold: 80,
        }
    }

    /// Set the category of spending the budget covers.
    pub fn category(mut self, category_id: Option<DatabaseID>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the first day of the budget's window.
    pub fn start_date(mut self, start_date: Date) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Set the last day (inclusive) of the budget's window.
    pub fn end_date(mut self, end_date: Date) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set the percentage of the budget amount at which the user wants to be
    /// notified.
    pub fn notification_threshold(mut self, notification_threshold: u8) -> Self {
        self.notification_threshold = notification_threshold;
        self
    }

    /// The window the budget covers, filling in the defaults: the start date
    /// falls back to the first day of the month containing `today` and the
    /// end date falls back to the end of one period starting there.
    pub fn date_range(&self, today: Date) -> (Date, Date) {
        let start_date = self.start_date.unwrap_or_else(|| {
            Date::from_calendar_date(today.year(), today.month(), 1)
                .expect("invalid month start date")
        });
        let end_date = self
            .end_date
            .unwrap_or_else(|| self.period.default_end_date(start_date));

        (start_date, end_date)
    }

    /// Check the builder against the budget invariants.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NegativeAmount] if the amount is negative,
    /// - or [Error::EndDateBeforeStart] if an explicit end date falls before
    ///   an explicit start date.
    pub fn validate(&self) -> Result<(), Error> {
        if self.amount < 0.0 {
            return Err(Error::NegativeAmount(self.amount));
        }

        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            if end_date < start_date {
                return Err(Error::EndDateBeforeStart {
                    start: start_date,
                    end: end_date,
                });
            }
        }

        Ok(())
    }
}
