//! Implements a SQLite backed transaction store.
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{
        DatabaseID, Direction, Frequency, Ledger, Recurrence, RecurrenceRule, Transaction,
        TransactionBuilder, UserID,
    },
    stores::{
        TransactionStore,
        transaction::{SortOrder, TransactionQuery},
    },
};

/// The column list shared by every query that loads full transactions. The
/// order matches the order [SQLiteTransactionStore::map_row] reads columns in.
pub(super) const TRANSACTION_COLUMNS: &str = "t.id, t.amount, t.date, t.description, t.ledger, \
     t.direction, t.category_id, t.user_id, t.template_id, r.frequency, r.anchor_day, \
     r.end_date, r.next_due, r.occurrence_count";

/// Stores transactions in a SQLite database.
///
/// Note that because a transaction depends on the
/// [Category](crate::models::Category) model, that model must be set up in
/// the database. Recurring templates also store their schedule state in the
/// table set up by [SQLiteScheduleStore](super::SQLiteScheduleStore).
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    /// Create a new transaction in the database.
    ///
    /// The builder is checked against the transaction invariants first, see
    /// [TransactionBuilder::validate]. When the builder carries a recurrence
    /// rule the new transaction is stored as the template and first
    /// occurrence of its series, with the cursor set to the rule's next
    /// occurrence after the transaction date.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if `category_id` does not refer to a valid category,
    /// - any error returned by [TransactionBuilder::validate],
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        builder.validate(OffsetDateTime::now_utc().date())?;

        let connection = self.connection.lock().unwrap();
        let tx = connection.unchecked_transaction()?;

        let id: DatabaseID = tx
            .prepare(
                "INSERT INTO \"transaction\" (amount, date, description, ledger, direction, category_id, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING id",
            )?
            .query_row(
                (
                    builder.amount,
                    builder.date,
                    &builder.description,
                    builder.ledger.code(),
                    builder.direction.map(|direction| direction.code()),
                    builder.category_id,
                    builder.user_id.as_i64(),
                ),
                |row| row.get(0),
            )
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                // The client tried to add a transaction for a non-existent category.
                rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                    Error::InvalidCategory
                }
                error => error.into(),
            })?;

        let recurrence = match builder.rule {
            Some(rule) => {
                let next_due = rule.frequency().next_occurrence(builder.date);

                tx.execute(
                    "INSERT INTO recurring_transaction
                     (transaction_id, frequency, anchor_day, end_date, next_due, occurrence_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                    (
                        id,
                        rule.frequency().code(),
                        rule.frequency().anchor_day(),
                        rule.end_date(),
                        next_due,
                    ),
                )?;

                Some(Recurrence::new_unchecked(rule, Some(next_due), 0))
            }
            None => None,
        };

        tx.commit()?;

        Ok(Transaction::new_unchecked(
            id,
            builder.amount,
            builder.date,
            builder.description,
            builder.ledger,
            builder.direction,
            builder.category_id,
            builder.user_id,
            recurrence,
            None,
        ))
    }

    /// Retrieve a transaction in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid transaction,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get(&self, id: DatabaseID) -> Result<Transaction, Error> {
        let transaction = self
            .connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
                 LEFT JOIN recurring_transaction r ON r.transaction_id = t.id
                 WHERE t.id = :id"
            ))?
            .query_row(&[(":id", &id)], Self::map_row)?;

        Ok(transaction)
    }

    /// Query for transactions in the database.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn get_query(&self, filter: TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let mut query_string_parts = vec![format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t
             LEFT JOIN recurring_transaction r ON r.transaction_id = t.id"
        )];
        let (where_clause_parts, query_parameters) = build_where_clause(&filter);

        if !where_clause_parts.is_empty() {
            query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
        }

        match filter.sort_date {
            Some(SortOrder::Ascending) => {
                query_string_parts.push("ORDER BY t.date ASC".to_string())
            }
            Some(SortOrder::Descending) => {
                query_string_parts.push("ORDER BY t.date DESC".to_string())
            }
            None => {}
        }

        if let Some(limit) = filter.limit {
            query_string_parts.push(format!("LIMIT {limit}"));
        }

        let query_string = query_string_parts.join(" ");
        let params = params_from_iter(query_parameters.iter());

        self.connection
            .lock()
            .unwrap()
            .prepare(&query_string)?
            .query_map(params, Self::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
            .collect()
    }

    /// Sum the amounts of the transactions matching `filter`.
    ///
    /// Returns zero when no transactions match. The `limit` and `sort_date`
    /// fields of the filter are ignored.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn sum_amount(&self, filter: TransactionQuery) -> Result<f64, Error> {
        let mut query_string_parts =
            vec!["SELECT COALESCE(SUM(t.amount), 0) FROM \"transaction\" t".to_string()];
        let (where_clause_parts, query_parameters) = build_where_clause(&filter);

        if !where_clause_parts.is_empty() {
            query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
        }

        let query_string = query_string_parts.join(" ");
        let params = params_from_iter(query_parameters.iter());

        self.connection
            .lock()
            .unwrap()
            .prepare(&query_string)?
            .query_row(params, |row| row.get(0))
            .map_err(|error| error.into())
    }

    /// The distinct calendar years, in increasing order, in which `user_id`
    /// has transactions on the `ledger` ledger.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn available_years(&self, user_id: UserID, ledger: Ledger) -> Result<Vec<i32>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT DISTINCT CAST(strftime('%Y', date) AS INTEGER) AS year
                 FROM \"transaction\"
                 WHERE user_id = :user_id AND ledger = :ledger
                 ORDER BY year",
            )?
            .query_map(
                &[(":user_id", &user_id.as_i64()), (":ledger", &ledger.code())],
                |row| row.get(0),
            )?
            .map(|maybe_year| maybe_year.map_err(Error::SqlError))
            .collect()
    }

    /// Delete the transaction with `id` belonging to `user_id`.
    ///
    /// Deleting a template also removes its schedule state. Occurrences
    /// created from the template stay in the ledger with their origin
    /// cleared.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DeleteMissingTransaction] if the transaction does not exist
    ///   or belongs to another user,
    /// - or [Error::SqlError] there is some other SQL error.
    fn delete(&mut self, id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            Err(Error::DeleteMissingTransaction)
        } else {
            Ok(())
        }
    }
}

/// Build the WHERE clause parts and parameters selecting the transactions
/// that match `filter`.
fn build_where_clause(filter: &TransactionQuery) -> (Vec<String>, Vec<Value>) {
    let mut where_clause_parts = vec![];
    let mut query_parameters = vec![];

    if let Some(user_id) = filter.user_id {
        where_clause_parts.push(format!("t.user_id = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(user_id.as_i64()));
    }

    if let Some(ledger) = filter.ledger {
        where_clause_parts.push(format!("t.ledger = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(ledger.code()));
    }

    if let Some(direction) = filter.direction {
        where_clause_parts.push(format!("t.direction = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(direction.code()));
    }

    if let Some(category_id) = filter.category_id {
        where_clause_parts.push(format!("t.category_id = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(category_id));
    }

    if let Some(date_range) = &filter.date_range {
        where_clause_parts.push(format!(
            "t.date BETWEEN ?{} AND ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Text(date_range.start().to_string()));
        query_parameters.push(Value::Text(date_range.end().to_string()));
    }

    (where_clause_parts, query_parameters)
}

impl CreateTable for SQLiteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection
                .execute(
                    "CREATE TABLE IF NOT EXISTS \"transaction\" (
                            id INTEGER PRIMARY KEY AUTOINCREMENT,
                            amount REAL NOT NULL,
                            date TEXT NOT NULL,
                            description TEXT NOT NULL,
                            ledger INTEGER NOT NULL,
                            direction INTEGER,
                            category_id INTEGER,
                            user_id INTEGER NOT NULL,
                            template_id INTEGER,
                            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
                            FOREIGN KEY(template_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE SET NULL
                            )",
                    (),
                )?;

        // Ensure the sequence starts at 1
        connection.execute(
            "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteTransactionStore {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id: DatabaseID = row.get(offset)?;
        let amount = row.get(offset + 1)?;
        let date = row.get(offset + 2)?;
        let description = row.get(offset + 3)?;

        let ledger_code: i64 = row.get(offset + 4)?;
        let ledger = Ledger::try_from(ledger_code).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 4,
                rusqlite::types::Type::Integer,
                Box::new(error),
            )
        })?;

        let direction_code: Option<i64> = row.get(offset + 5)?;
        let direction = direction_code
            .map(|code| {
                Direction::try_from(code).map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(
                        offset + 5,
                        rusqlite::types::Type::Integer,
                        Box::new(error),
                    )
                })
            })
            .transpose()?;

        let category_id = row.get(offset + 6)?;
        let user_id = UserID::new(row.get(offset + 7)?);
        let template_id = row.get(offset + 8)?;

        let frequency_code: Option<i64> = row.get(offset + 9)?;
        let recurrence = match frequency_code {
            Some(code) => {
                let anchor_day: Option<u8> = row.get(offset + 10)?;
                let end_date: Option<Date> = row.get(offset + 11)?;
                let next_due: Option<Date> = row.get(offset + 12)?;
                let occurrence_count: i64 = row.get(offset + 13)?;

                match Frequency::from_parts(code, anchor_day) {
                    Ok(frequency) => Some(Recurrence::new_unchecked(
                        RecurrenceRule::new_unchecked(frequency, end_date),
                        next_due,
                        occurrence_count,
                    )),
                    Err(error) => {
                        tracing::warn!("ignoring schedule for transaction {id}: {error}");
                        None
                    }
                }
            }
            None => None,
        };

        let transaction = Transaction::new_unchecked(
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
        );

        Ok(transaction)
    }
}
