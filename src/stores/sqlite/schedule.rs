//! Implements a SQLite backed store for recurring transaction schedules.
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};
use time::Date;

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{DatabaseID, Direction, Frequency, Ledger, Transaction, UserID},
    stores::{
        ScheduleStore,
        schedule::{DueTemplate, TemplateUpdate},
        sqlite::transaction::{SQLiteTransactionStore, TRANSACTION_COLUMNS},
    },
};

/// Stores the schedule state of recurring transaction templates in a SQLite
/// database.
///
/// Templates live in the same table as ordinary transactions, set up by
/// [SQLiteTransactionStore]. This store owns the table holding their
/// schedule state (frequency, end date, cursor and occurrence count).
#[derive(Debug, Clone)]
pub struct SQLiteScheduleStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteScheduleStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl ScheduleStore for SQLiteScheduleStore {
    /// Retrieve the templates whose next due date falls on or before `date`,
    /// ordered by due date.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn due_templates(&self, date: Date) -> Result<Vec<DueTemplate>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT t.id, t.amount, t.description, t.ledger, t.direction, t.category_id,
                        t.user_id, t.date, r.frequency, r.anchor_day, r.end_date, r.next_due
                 FROM \"transaction\" t
                 INNER JOIN recurring_transaction r ON r.transaction_id = t.id
                 WHERE r.next_due IS NOT NULL AND r.next_due <= :date
                 ORDER BY r.next_due",
            )?
            .query_map(&[(":date", &date)], Self::map_row)?
            .map(|maybe_template| maybe_template.map_err(Error::SqlError))
            .collect()
    }

    /// Create the occurrence of `template` dated `occurrence_date` and move
    /// the template's cursor to `next_due`.
    ///
    /// The insert and the cursor update happen in one database transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if the template was deleted since it was scanned,
    /// - or [Error::SqlError] there is some other SQL error.
    fn materialize_occurrence(
        &mut self,
        template: &DueTemplate,
        occurrence_date: Date,
        next_due: Option<Date>,
    ) -> Result<Transaction, Error> {
        let connection = self.connection.lock().unwrap();
        let tx = connection.unchecked_transaction()?;

        let description = format!("{} (Recurring)", template.description);

        let id: DatabaseID = tx
            .prepare(
                "INSERT INTO \"transaction\"
                 (amount, date, description, ledger, direction, category_id, user_id, template_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 RETURNING id",
            )?
            .query_row(
                (
                    template.amount,
                    occurrence_date,
                    &description,
                    template.ledger.code(),
                    template.direction.map(|direction| direction.code()),
                    template.category_id,
                    template.user_id.as_i64(),
                    template.id,
                ),
                |row| row.get(0),
            )
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                // The template was deleted after the scan.
                rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                    Error::NotFound
                }
                error => error.into(),
            })?;

        let rows_updated = tx.execute(
            "UPDATE recurring_transaction
             SET next_due = ?1, occurrence_count = occurrence_count + 1
             WHERE transaction_id = ?2",
            (next_due, template.id),
        )?;

        if rows_updated == 0 {
            // The schedule state disappeared between the scan and now.
            // Dropping the transaction rolls the insert back.
            return Err(Error::NotFound);
        }

        tx.commit()?;

        Ok(Transaction::new_unchecked(
            id,
            template.amount,
            occurrence_date,
            description,
            template.ledger,
            template.direction,
            template.category_id,
            template.user_id,
            None,
            Some(template.id),
        ))
    }

    /// Mark the template's series exhausted so it is never scanned again.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if no template with `template_id` exists,
    /// - or [Error::SqlError] there is some other SQL error.
    fn exhaust_template(&mut self, template_id: DatabaseID) -> Result<(), Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "UPDATE recurring_transaction SET next_due = NULL WHERE transaction_id = ?1",
            (template_id,),
        )?;

        if rows_affected == 0 {
            Err(Error::NotFound)
        } else {
            Ok(())
        }
    }

    /// Retrieve all of a user's recurring transaction templates, ordered by
    /// next due date.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn recurring_templates(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
                 INNER JOIN recurring_transaction r ON r.transaction_id = t.id
                 WHERE t.user_id = :user_id
                 ORDER BY r.next_due"
            ))?
            .query_map(
                &[(":user_id", &user_id.as_i64())],
                SQLiteTransactionStore::map_row,
            )?
            .map(|maybe_template| maybe_template.map_err(Error::SqlError))
            .collect()
    }

    /// Apply `update` to the template with `id` belonging to `user_id` and
    /// recompute its next due date.
    ///
    /// The cursor is recomputed from the old next due date. Updating an
    /// exhausted series revives it, stepping from the latest occurrence the
    /// series created (or from the template's own date when it created
    /// none) so no occurrence is repeated. Monthly schedules without an
    /// explicit anchor day are anchored to the day of the template's date
    /// for the recomputation.
    fn update_template(
        &mut self,
        id: DatabaseID,
        user_id: UserID,
        update: TemplateUpdate,
    ) -> Result<Transaction, Error> {
        let connection = self.connection.lock().unwrap();
        let tx = connection.unchecked_transaction()?;

        let current = tx
            .prepare(
                "SELECT t.amount, t.date, t.description, t.category_id, t.ledger,
                        r.frequency, r.anchor_day, r.end_date, r.next_due
                 FROM \"transaction\" t
                 INNER JOIN recurring_transaction r ON r.transaction_id = t.id
                 WHERE t.id = ?1 AND t.user_id = ?2",
            )?
            .query_row((id, user_id.as_i64()), |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, Date>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<DatabaseID>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, Option<u8>>(6)?,
                    row.get::<_, Option<Date>>(7)?,
                    row.get::<_, Option<Date>>(8)?,
                ))
            });

        let (
            current_amount,
            date,
            current_description,
            current_category_id,
            ledger_code,
            frequency_code,
            anchor_day,
            current_end_date,
            next_due,
        ) = match current {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // Distinguish a plain transaction from one that does not exist.
                let exists: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
                    (id, user_id.as_i64()),
                    |row| row.get(0),
                )?;

                return if exists > 0 {
                    Err(Error::NotRecurring)
                } else {
                    Err(Error::NotFound)
                };
            }
            Err(error) => return Err(error.into()),
        };

        let ledger = Ledger::try_from(ledger_code).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Integer,
                Box::new(error),
            )
        })?;

        let current_frequency = Frequency::from_parts(frequency_code, anchor_day).ok();
        let Some(frequency) = update.frequency.or(current_frequency) else {
            // The stored frequency is unusable and the update does not
            // replace it.
            return Err(Error::NotRecurring);
        };

        if !ledger.supports(frequency) {
            return Err(Error::FrequencyNotAvailable { frequency, ledger });
        }

        if let Some(anchor_day) = frequency.anchor_day() {
            if !(1..=31).contains(&anchor_day) {
                return Err(Error::InvalidAnchorDay(anchor_day));
            }
        }

        let amount = update.amount.unwrap_or(current_amount);
        if amount < 0.0 {
            return Err(Error::NegativeAmount(amount));
        }

        let description = update.description.unwrap_or(current_description);
        let category_id = update.category_id.unwrap_or(current_category_id);
        let end_date = update.end_date.unwrap_or(current_end_date);

        if let Some(end_date) = end_date {
            if end_date <= date {
                return Err(Error::EndDateBeforeStart {
                    start: date,
                    end: end_date,
                });
            }
        }

        // Step the cursor from where the series left off. An exhausted
        // series resumes after its most recent occurrence; the template's
        // own row seeds the max when it never created any.
        let base = match next_due {
            Some(cursor) => cursor,
            None => tx.query_row(
                "SELECT MAX(date) FROM \"transaction\" WHERE id = ?1 OR template_id = ?1",
                (id,),
                |row| row.get(0),
            )?,
        };
        let new_next_due = frequency.with_anchor_from(date).next_occurrence(base);

        tx.execute(
            "UPDATE \"transaction\" SET amount = ?1, description = ?2, category_id = ?3
             WHERE id = ?4",
            (amount, &description, category_id, id),
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            // The client tried to move the template to a non-existent category.
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                Error::InvalidCategory
            }
            error => error.into(),
        })?;

        tx.execute(
            "UPDATE recurring_transaction
             SET frequency = ?1, anchor_day = ?2, end_date = ?3, next_due = ?4
             WHERE transaction_id = ?5",
            (
                frequency.code(),
                frequency.anchor_day(),
                end_date,
                new_next_due,
                id,
            ),
        )?;

        let transaction = tx
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
                 LEFT JOIN recurring_transaction r ON r.transaction_id = t.id
                 WHERE t.id = :id"
            ))?
            .query_row(&[(":id", &id)], SQLiteTransactionStore::map_row)?;

        tx.commit()?;

        Ok(transaction)
    }

    /// Delete the template with `id` belonging to `user_id` along with its
    /// occurrences dated `today` or later.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if no transaction with `id` belongs to `user_id`,
    /// - [Error::NotRecurring] if the transaction is not a template,
    /// - or [Error::SqlError] there is some other SQL error.
    fn delete_series(
        &mut self,
        id: DatabaseID,
        user_id: UserID,
        today: Date,
    ) -> Result<(), Error> {
        let connection = self.connection.lock().unwrap();
        let tx = connection.unchecked_transaction()?;

        let is_template: i64 = tx.query_row(
            "SELECT COUNT(*) FROM \"transaction\" t
             INNER JOIN recurring_transaction r ON r.transaction_id = t.id
             WHERE t.id = ?1 AND t.user_id = ?2",
            (id, user_id.as_i64()),
            |row| row.get(0),
        )?;

        if is_template == 0 {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
                (id, user_id.as_i64()),
                |row| row.get(0),
            )?;

            return if exists > 0 {
                Err(Error::NotRecurring)
            } else {
                Err(Error::NotFound)
            };
        }

        // Past occurrences stay in the ledger as history.
        tx.execute(
            "DELETE FROM \"transaction\" WHERE template_id = ?1 AND user_id = ?2 AND date >= ?3",
            (id, user_id.as_i64(), today),
        )?;

        tx.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

        tx.commit()?;

        Ok(())
    }
}

impl CreateTable for SQLiteScheduleStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS recurring_transaction (
                    transaction_id INTEGER PRIMARY KEY,
                    frequency INTEGER NOT NULL,
                    anchor_day INTEGER,
                    end_date TEXT,
                    next_due TEXT,
                    occurrence_count INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteScheduleStore {
    type ReturnType = DueTemplate;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id: DatabaseID = row.get(offset)?;
        let amount = row.get(offset + 1)?;
        let description = row.get(offset + 2)?;

        let ledger_code: i64 = row.get(offset + 3)?;
        let ledger = Ledger::try_from(ledger_code).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 3,
                rusqlite::types::Type::Integer,
                Box::new(error),
            )
        })?;

        let direction_code: Option<i64> = row.get(offset + 4)?;
        let direction = direction_code
            .map(|code| {
                Direction::try_from(code).map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(
                        offset + 4,
                        rusqlite::types::Type::Integer,
                        Box::new(error),
                    )
                })
            })
            .transpose()?;

        let category_id = row.get(offset + 5)?;
        let user_id = UserID::new(row.get(offset + 6)?);
        let date = row.get(offset + 7)?;

        let frequency_code: i64 = row.get(offset + 8)?;
        let anchor_day: Option<u8> = row.get(offset + 9)?;
        let frequency = match Frequency::from_parts(frequency_code, anchor_day) {
            Ok(frequency) => Some(frequency),
            Err(error) => {
                tracing::warn!("schedule template {id} has an unusable frequency: {error}");
                None
            }
        };

        let end_date = row.get(offset + 10)?;
        let next_due = row.get(offset + 11)?;

        Ok(DueTemplate {
            id,
            amount,
            description,
            ledger,
            direction,
            category_id,
            user_id,
            date,
            frequency,
            end_date,
            next_due,
        })
    }
}
