//! Implements a SQLite backed category store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{Category, CategoryName, DatabaseID, UserID},
    stores::CategoryStore,
};

/// Creates and retrieves transaction categories to/from a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCategoryStore {
    /// Create a new category store with a SQLite database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn insert(&self, name: CategoryName, user_id: UserID, is_global: bool) -> Result<Category, Error> {
        let connection = self.connection.lock().unwrap();
        connection.execute(
            "INSERT INTO category (name, user_id, is_global) VALUES (?1, ?2, ?3);",
            (name.as_ref(), user_id.as_i64(), is_global),
        )?;

        let id = connection.last_insert_rowid();

        Ok(Category::new(id, name, user_id, is_global))
    }
}

impl CategoryStore for SQLiteCategoryStore {
    /// Create a category in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateCategoryName] if the user already has a category
    ///   with `name`,
    /// - or [Error::SqlError] there is some other SQL error.
    fn create(&self, name: CategoryName, user_id: UserID) -> Result<Category, Error> {
        self.insert(name, user_id, false)
    }

    /// Create a global category in the database, visible to every user.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateCategoryName] if the user already has a category
    ///   with `name`,
    /// - or [Error::SqlError] there is some other SQL error.
    fn create_global(&self, name: CategoryName, user_id: UserID) -> Result<Category, Error> {
        self.insert(name, user_id, true)
    }

    /// Retrieve categories in the database for the category with `category_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `category_id` does not refer to a valid category,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get(&self, category_id: DatabaseID) -> Result<Category, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare("SELECT id, name, user_id, is_global FROM category WHERE id = :id;")?
            .query_row(&[(":id", &category_id)], SQLiteCategoryStore::map_row)
            .map_err(|error| error.into())
    }

    /// Retrieve the categories visible to `user_id`: their own plus the
    /// global ones, ordered by name.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn get_by_user(&self, user_id: UserID) -> Result<Vec<Category>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT id, name, user_id, is_global FROM category
                 WHERE user_id = :user_id OR is_global = 1
                 ORDER BY name;",
            )?
            .query_map(
                &[(":user_id", &user_id.as_i64())],
                SQLiteCategoryStore::map_row,
            )?
            .map(|maybe_category| maybe_category.map_err(|error| error.into()))
            .collect()
    }

    /// Rename the category with `category_id` belonging to `user_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UpdateMissingCategory] if the category does not exist or
    ///   belongs to another user,
    /// - [Error::DuplicateCategoryName] if the user already has a category
    ///   with `name`,
    /// - or [Error::SqlError] there is some other SQL error.
    fn rename(
        &mut self,
        category_id: DatabaseID,
        user_id: UserID,
        name: CategoryName,
    ) -> Result<Category, Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "UPDATE category SET name = ?1 WHERE id = ?2 AND user_id = ?3",
            (name.as_ref(), category_id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            return Err(Error::UpdateMissingCategory);
        }

        self.get(category_id)
    }

    /// Delete the category with `category_id` belonging to `user_id`.
    ///
    /// Transactions assigned to the category keep their amounts but lose the
    /// category reference.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DeleteMissingCategory] if the category does not exist,
    ///   belongs to another user or is global,
    /// - or [Error::SqlError] there is some other SQL error.
    fn delete(&mut self, category_id: DatabaseID, user_id: UserID) -> Result<(), Error> {
        let rows_affected = self.connection.lock().unwrap().execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2 AND is_global = 0",
            (category_id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            Err(Error::DeleteMissingCategory)
        } else {
            Ok(())
        }
    }
}

impl CreateTable for SQLiteCategoryStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                is_global INTEGER NOT NULL DEFAULT 0,
                UNIQUE(name, user_id)
            );",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteCategoryStore {
    type ReturnType = Category;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;

        let raw_name: String = row.get(offset + 1)?;
        let name = CategoryName::new_unchecked(&raw_name);

        let user_id = UserID::new(row.get(offset + 2)?);
        let is_global = row.get(offset + 3)?;

        Ok(Category::new(id, name, user_id, is_global))
    }
}
