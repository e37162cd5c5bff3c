//! This file defines the type `Transaction`, the core type of the ledger, and
//! the builder used to create new transactions.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    models::{DatabaseID, Frequency, Recurrence, RecurrenceRule, UserID},
};

/// The error returned when a ledger code from the database does not map to a
/// known ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a valid ledger code")]
pub struct LedgerError(pub i64);

/// Which side of the user's finances a transaction belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ledger {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl Ledger {
    /// The integer code the ledger is stored under in the database.
    pub fn code(&self) -> i64 {
        match self {
            Ledger::Expense => 0,
            Ledger::Income => 1,
        }
    }

    /// Whether `frequency` is available for schedule templates in this ledger.
    ///
    /// Expenses repeat on calendar cycles (daily, weekly, monthly, yearly)
    /// while income repeats on pay cycles (weekly, biweekly, monthly).
    pub fn supports(&self, frequency: Frequency) -> bool {
        match self {
            Ledger::Expense => !matches!(frequency, Frequency::Biweekly),
            Ledger::Income => matches!(
                frequency,
                Frequency::Weekly | Frequency::Biweekly | Frequency::Monthly { .. }
            ),
        }
    }
}

impl TryFrom<i64> for Ledger {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Ledger::Expense),
            1 => Ok(Ledger::Income),
            _ => Err(LedgerError(value)),
        }
    }
}

impl Display for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ledger::Expense => write!(f, "expense"),
            Ledger::Income => write!(f, "income"),
        }
    }
}

/// The error returned when a direction code from the database does not map to
/// a known direction.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a valid direction code")]
pub struct DirectionError(pub i64);

/// Whether money left or entered the account.
///
/// Only expense transactions carry a direction: a credit marks a refund or
/// reimbursement that offsets earlier spending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Money left the account.
    Debit,
    /// Money entered the account, e.g. a refund.
    Credit,
}

impl Direction {
    /// The integer code the direction is stored under in the database.
    pub fn code(&self) -> i64 {
        match self {
            Direction::Debit => 0,
            Direction::Credit => 1,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = DirectionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Debit),
            1 => Ok(Direction::Credit),
            _ => Err(DirectionError(value)),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Debit => write!(f, "debit"),
            Direction::Credit => write!(f, "credit"),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions that carry a [Recurrence] are schedule templates: besides
/// recording their own first occurrence, they generate dated copies of
/// themselves on a schedule. Generated copies point back at their template
/// through [Transaction::template_id].
///
/// To create a new transaction, use [Transaction::expense] or
/// [Transaction::income] and finalize the builder with
/// [TransactionStore::create](crate::stores::TransactionStore::create).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: DatabaseID,
    amount: f64,
    date: Date,
    description: String,
    ledger: Ledger,
    direction: Option<Direction>,
    category_id: Option<DatabaseID>,
    user_id: UserID,
    recurrence: Option<Recurrence>,
    template_id: Option<DatabaseID>,
}

impl Transaction {
    /// Create a builder for a new expense.
    pub fn expense(amount: f64, user_id: UserID) -> TransactionBuilder {
        TransactionBuilder::new(amount, Ledger::Expense, user_id)
    }

    /// Create a builder for a new income transaction.
    pub fn income(amount: f64, user_id: UserID) -> TransactionBuilder {
        TransactionBuilder::new(amount, Ledger::Income, user_id)
    }

    /// Reassemble a transaction from its database form.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the transaction invariants are violated it will cause incorrect
    /// behaviour but not affect memory safety.
    #[allow(clippy::too_many_arguments)]
    pub fn new_unchecked(
        id: DatabaseID,
        amount: f64,
        date: Date,
        description: String,
        ledger: Ledger,
        direction: Option<Direction>,
        category_id: Option<DatabaseID>,
        user_id: UserID,
        recurrence: Option<Recurrence>,
        template_id: Option<DatabaseID>,
    ) -> Self {
        Self {
            id,
            amount,
            date,
            description,
            ledger,
            direction,
            category_id,
            user_id,
            recurrence,
            template_id,
        }
    }

    /// The ID of the transaction.
    pub fn id(&self) -> DatabaseID {
        self.id
    }

    /// The amount of money spent or earned in this transaction.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// When the transaction happened, or for schedule templates the date the
    /// series took effect.
    pub fn date(&self) -> Date {
        self.date
    }

    /// A text description of what the transaction was for.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Which ledger the transaction belongs to.
    pub fn ledger(&self) -> Ledger {
        self.ledger
    }

    /// Whether money left or entered the account. Income transactions have no
    /// direction.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// A user-defined category that describes the type of the transaction.
    pub fn category_id(&self) -> Option<DatabaseID> {
        self.category_id
    }

    /// The ID of the user that owns this transaction.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    /// The schedule state attached to this transaction, if it is a schedule
    /// template.
    pub fn recurrence(&self) -> Option<Recurrence> {
        self.recurrence
    }

    /// The template that generated this transaction, if any.
    pub fn template_id(&self) -> Option<DatabaseID> {
        self.template_id
    }
}

/// Builder for creating a new [Transaction].
///
/// Finalize the builder with
/// [TransactionStore::create](crate::stores::TransactionStore::create).
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The amount of money spent or earned.
    pub amount: f64,
    /// When the transaction happened, or for schedule templates the date the
    /// series takes effect. Defaults to today.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Which ledger the transaction belongs to.
    pub ledger: Ledger,
    /// Whether money left or entered the account. Expenses default to a
    /// debit, income transactions have no direction.
    pub direction: Option<Direction>,
    /// The category the transaction falls under. Expenses only.
    pub category_id: Option<DatabaseID>,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// The schedule the transaction repeats by. Setting a rule makes the
    /// transaction a schedule template.
    pub rule: Option<RecurrenceRule>,
}

impl TransactionBuilder {
    /// Create a new transaction builder.
    pub fn new(amount: f64, ledger: Ledger, user_id: UserID) -> Self {
        let direction = match ledger {
            Ledger::Expense => Some(Direction::Debit),
            Ledger::Income => None,
        };

        Self {
            amount,
            date: OffsetDateTime::now_utc().date(),
            description: String::new(),
            ledger,
            direction,
            category_id: None,
            user_id,
            rule: None,
        }
    }

    /// Set the date of the transaction.
    pub fn date(mut self, date: Date) -> Self {
        self.date = date;
        self
    }

    /// Set the description of the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the category of the transaction.
    pub fn category(mut self, category_id: Option<DatabaseID>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set whether money left or entered the account.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Attach a recurrence rule, making the transaction a schedule template.
    pub fn recurring(mut self, rule: RecurrenceRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Check the builder against the transaction invariants.
    ///
    /// `today` is the date that the future-date check is made against.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NegativeAmount] if the amount is negative,
    /// - [Error::FutureDate] if a plain transaction is dated after `today`
    ///   (schedule templates may take effect in the future),
    /// - [Error::DirectionOnIncome] if a direction is set on an income
    ///   transaction,
    /// - [Error::CategoryOnIncome] if a category is set on an income
    ///   transaction,
    /// - [Error::FrequencyNotAvailable] if the rule's frequency is not
    ///   available for the transaction's ledger,
    /// - [Error::InvalidAnchorDay] if the rule's monthly anchor day is
    ///   outside 1-31,
    /// - or [Error::EndDateBeforeStart] if the rule ends on or before the
    ///   date the series takes effect.
    pub fn validate(&self, today: Date) -> Result<(), Error> {
        if self.amount < 0.0 {
            return Err(Error::NegativeAmount(self.amount));
        }

        if self.rule.is_none() && self.date > today {
            return Err(Error::FutureDate(self.date));
        }

        if self.ledger == Ledger::Income {
            if self.direction.is_some() {
                return Err(Error::DirectionOnIncome);
            }

            if self.category_id.is_some() {
                return Err(Error::CategoryOnIncome);
            }
        }

        if let Some(rule) = self.rule {
            if !self.ledger.supports(rule.frequency()) {
                return Err(Error::FrequencyNotAvailable {
                    frequency: rule.frequency(),
                    ledger: self.ledger,
                });
            }

            if let Some(anchor_day) = rule.frequency().anchor_day() {
                if !(1..=31).contains(&anchor_day) {
                    return Err(Error::InvalidAnchorDay(anchor_day));
                }
            }

            if let Some(end_date) = rule.end_date() {
                if end_date <= self.date {
                    return Err(Error::EndDateBeforeStart {
                        start: self.date,
                        end: end_date,
                    });
                }
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod transaction_builder_tests {
    use time::{Date, macros::date};

    use crate::{
        Error,
        models::{Direction, Frequency, Ledger, RecurrenceRule, Transaction, UserID},
    };

    fn today() -> Date {
        date!(2024 - 06 - 15)
    }

    #[test]
    fn new_expense_defaults_to_debit() {
        let builder = Transaction::expense(12.5, UserID::new(1));

        assert_eq!(builder.ledger, Ledger::Expense);
        assert_eq!(builder.direction, Some(Direction::Debit));
    }

    #[test]
    fn new_income_has_no_direction() {
        let builder = Transaction::income(12.5, UserID::new(1));

        assert_eq!(builder.ledger, Ledger::Income);
        assert_eq!(builder.direction, None);
    }

    #[test]
    fn validate_rejects_negative_amount() {
        let result = Transaction::expense(-1.0, UserID::new(1))
            .date(today())
            .validate(today());

        assert_eq!(result, Err(Error::NegativeAmount(-1.0)));
    }

    #[test]
    fn validate_rejects_future_date_on_plain_transaction() {
        let tomorrow = date!(2024 - 06 - 16);

        let result = Transaction::expense(1.0, UserID::new(1))
            .date(tomorrow)
            .validate(today());

        assert_eq!(result, Err(Error::FutureDate(tomorrow)));
    }

    #[test]
    fn validate_allows_future_date_on_template() {
        let result = Transaction::expense(1.0, UserID::new(1))
            .date(date!(2024 - 07 - 01))
            .recurring(RecurrenceRule::new(Frequency::Weekly, None).unwrap())
            .validate(today());

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn validate_rejects_direction_on_income() {
        let result = Transaction::income(1.0, UserID::new(1))
            .date(today())
            .direction(Direction::Credit)
            .validate(today());

        assert_eq!(result, Err(Error::DirectionOnIncome));
    }

    #[test]
    fn validate_rejects_category_on_income() {
        let result = Transaction::income(1.0, UserID::new(1))
            .date(today())
            .category(Some(1))
            .validate(today());

        assert_eq!(result, Err(Error::CategoryOnIncome));
    }

    #[test]
    fn validate_rejects_biweekly_expense_schedule() {
        let result = Transaction::expense(1.0, UserID::new(1))
            .date(today())
            .recurring(RecurrenceRule::new(Frequency::Biweekly, None).unwrap())
            .validate(today());

        assert_eq!(
            result,
            Err(Error::FrequencyNotAvailable {
                frequency: Frequency::Biweekly,
                ledger: Ledger::Expense,
            })
        );
    }

    #[test]
    fn validate_rejects_daily_income_schedule() {
        let result = Transaction::income(1.0, UserID::new(1))
            .date(today())
            .recurring(RecurrenceRule::new(Frequency::Daily, None).unwrap())
            .validate(today());

        assert_eq!(
            result,
            Err(Error::FrequencyNotAvailable {
                frequency: Frequency::Daily,
                ledger: Ledger::Income,
            })
        );
    }

    #[test]
    fn validate_rejects_end_date_on_or_before_start() {
        let result = Transaction::expense(1.0, UserID::new(1))
            .date(today())
            .recurring(RecurrenceRule::new(Frequency::Weekly, Some(today())).unwrap())
            .validate(today());

        assert_eq!(
            result,
            Err(Error::EndDateBeforeStart {
                start: today(),
                end: today(),
            })
        );
    }

    #[test]
    fn validate_accepts_monthly_income_schedule() {
        let result = Transaction::income(1.0, UserID::new(1))
            .date(today())
            .recurring(
                RecurrenceRule::new(
                    Frequency::Monthly {
                        anchor_day: Some(15),
                    },
                    None,
                )
                .unwrap(),
            )
            .validate(today());

        assert_eq!(result, Ok(()));
    }
}
