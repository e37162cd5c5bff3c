//! Implements a SQLite backed budget store.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, Row};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{Budget, BudgetBuilder, BudgetPeriod, DatabaseID, UserID},
    stores::{BudgetStore, budget::BudgetUpdate},
};

/// The column list shared by every query that loads budgets, in the order
/// [SQLiteBudgetStore::map_row] reads columns in.
const BUDGET_COLUMNS: &str = "id, name, amount, category_id, period, start_date, end_date, \
     user_id, is_active, notification_threshold";

/// Stores budgets in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteBudgetStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteBudgetStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

/// Check that `category_id` refers to an existing category.
///
/// Budgets keep their category reference when the category is later deleted,
/// so the reference is checked on the way in rather than enforced by the
/// schema.
fn check_category_exists(connection: &Connection, category_id: DatabaseID) -> Result<(), Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM category WHERE id = ?1",
        (category_id,),
        |row| row.get(0),
    )?;

    if count == 0 {
        Err(Error::InvalidCategory)
    } else {
        Ok(())
    }
}

impl BudgetStore for SQLiteBudgetStore {
    /// Create a new budget in the database.
    ///
    /// The builder is checked against the budget invariants first, see
    /// [BudgetBuilder::validate]. Missing dates are filled in with
    /// [BudgetBuilder::date_range] and new budgets start out active.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if the builder's category does not exist,
    /// - any error returned by [BudgetBuilder::validate],
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&mut self, builder: BudgetBuilder) -> Result<Budget, Error> {
        builder.validate()?;

        let (start_date, end_date) = builder.date_range(OffsetDateTime::now_utc().date());

        let connection = self.connection.lock().unwrap();

        if let Some(category_id) = builder.category_id {
            check_category_exists(&connection, category_id)?;
        }

        connection.execute(
            "INSERT INTO budget
             (name, amount, category_id, period, start_date, end_date, user_id, is_active, notification_threshold)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
            (
                &builder.name,
                builder.amount,
                builder.category_id,
                builder.period.code(),
                start_date,
                end_date,
                builder.user_id.as_i64(),
                builder.notification_threshold,
            ),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Budget::new_unchecked(
            id,
            builder.name,
            builder.amount,
            builder.category_id,
            builder.period,
            start_date,
            end_date,
            builder.user_id,
            true,
            builder.notification_threshold,
        ))
    }

    /// Retrieve the budget with `id` belonging to `user_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if the budget does not exist or belongs to another
    ///   user,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get(&self, id: DatabaseID, user_id: UserID) -> Result<Budget, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {BUDGET_COLUMNS} FROM budget WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row((id, user_id.as_i64()), Self::map_row)
            .map_err(|error| error.into())
    }

    /// Retrieve all of a user's budgets.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn get_by_user(&self, user_id: UserID, include_inactive: bool) -> Result<Vec<Budget>, Error> {
        let mut query_string =
            format!("SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = :user_id");
        if !include_inactive {
            query_string.push_str(" AND is_active = 1");
        }

        self.connection
            .lock()
            .unwrap()
            .prepare(&query_string)?
            .query_map(&[(":user_id", &user_id.as_i64())], Self::map_row)?
            .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
            .collect()
    }

    /// Retrieve the user's active budgets whose windows contain `date`.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn active_covering(&self, user_id: UserID, date: Date) -> Result<Vec<Budget>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {BUDGET_COLUMNS} FROM budget
                 WHERE user_id = ?1 AND is_active = 1 AND start_date <= ?2 AND end_date >= ?2"
            ))?
            .query_map((user_id.as_i64(), date), Self::map_row)?
            .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
            .collect()
    }

    /// Retrieve the user's budgets whose windows overlap `date_range`.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn overlapping(
        &self,
        user_id: UserID,
        date_range: RangeInclusive<Date>,
        active_only: bool,
    ) -> Result<Vec<Budget>, Error> {
        let mut query_string = format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE user_id = ?1 AND start_date <= ?2 AND end_date >= ?3"
        );
        if active_only {
            query_string.push_str(" AND is_active = 1");
        }

        self.connection
            .lock()
            .unwrap()
            .prepare(&query_string)?
            .query_map(
                (user_id.as_i64(), *date_range.end(), *date_range.start()),
                Self::map_row,
            )?
            .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
            .collect()
    }

    /// Apply `update` to the budget with `id` belonging to `user_id`.
    fn update(
        &mut self,
        id: DatabaseID,
        user_id: UserID,
        update: BudgetUpdate,
    ) -> Result<Budget, Error> {
        let current = match self.get(id, user_id) {
            Ok(budget) => budget,
            Err(Error::NotFound) => return Err(Error::UpdateMissingBudget),
            Err(error) => return Err(error),
        };

        let name = update.name.unwrap_or_else(|| current.name().to_string());
        let amount = update.amount.unwrap_or(current.amount());
        let category_id = update.category_id.unwrap_or(current.category_id());
        let period = update.period.unwrap_or(current.period());
        let start_date = update.start_date.unwrap_or(current.start_date());
        let end_date = update.end_date.unwrap_or(current.end_date());
        let is_active = update.is_active.unwrap_or(current.is_active());
        let notification_threshold = update
            .notification_threshold
            .unwrap_or(current.notification_threshold());

        if amount < 0.0 {
            return Err(Error::NegativeAmount(amount));
        }

        if end_date < start_date {
            return Err(Error::EndDateBeforeStart {
                start: start_date,
                end: end_date,
            });
        }

        let connection = self.connection.lock().unwrap();

        if let Some(Some(new_category_id)) = update.category_id {
            check_category_exists(&connection, new_category_id)?;
        }

        connection.execute(
            "UPDATE budget
             SET name = ?1, amount = ?2, category_id = ?3, period = ?4, start_date = ?5,
                 end_date = ?6, is_active = ?7, notification_threshold = ?8
             WHERE id = ?9 AND user_id = ?10",
            (
                &name,
                amount,
                category_id,
                period.code(),
                start_date,
                end_date,
                is_active,
                notification_threshold,
                id,
                user_id.as_i64(),
            ),
        )?;

        Ok(Budget::new_unchecked(
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
        ))
    }

    /// Mark the budget with `id` belonging to `user_id` inactive.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UpdateMissingBudget] if the budget does not exist or belongs
    ///   to another user,
    /// - or [Error::SqlError] there is some other SQL error.
    fn deactivate(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "UPDATE budget SET is_active = 0 WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            Err(Error::UpdateMissingBudget)
        } else {
            Ok(())
        }
    }

    /// Delete the budget with `id` belonging to `user_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DeleteMissingBudget] if the budget does not exist or belongs
    ///   to another user,
    /// - or [Error::SqlError] there is some other SQL error.
    fn delete(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            Err(Error::DeleteMissingBudget)
        } else {
            Ok(())
        }
    }
}

impl CreateTable for SQLiteBudgetStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        // No foreign key on category_id: budgets keep their reference when
        // the category is deleted and report it as unknown.
        connection.execute(
            "CREATE TABLE IF NOT EXISTS budget (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    amount REAL NOT NULL,
                    category_id INTEGER,
                    period INTEGER NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    notification_threshold INTEGER NOT NULL DEFAULT 80
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteBudgetStore {
    type ReturnType = Budget;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;
        let name = row.get(offset + 1)?;
        let amount = row.get(offset + 2)?;
        let category_id = row.get(offset + 3)?;

        let period_code: i64 = row.get(offset + 4)?;
        let period = BudgetPeriod::try_from(period_code).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 4,
                rusqlite::types::Type::Integer,
                Box::new(error),
            )
        })?;

        let start_date = row.get(offset + 5)?;
        let end_date = row.get(offset + 6)?;
        let user_id = UserID::new(row.get(offset + 7)?);
        let is_active = row.get(offset + 8)?;
        let notification_threshold = row.get(offset + 9)?;

        Ok(Budget::new_unchecked(
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
        ))
    }
}
