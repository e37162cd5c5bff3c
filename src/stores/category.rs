//! Defines the category store trait.

use crate::{
    Error,
    models::{Category, CategoryName, DatabaseID, UserID},
};

/// The display name used for budgets and totals that cover all spending.
pub const OVERALL_CATEGORY: &str = "Overall";

/// The display name used when a category reference points at a category that
/// no longer exists.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Creates and retrieves transaction categories for transactions.
pub trait CategoryStore {
    /// Create a new category and add it to the store.
    fn create(&self, name: CategoryName, user_id: UserID) -> Result<Category, Error>;

    /// Create a new global category and add it to the store.
    ///
    /// Global categories are visible to every user but still record which
    /// user created them.
    fn create_global(&self, name: CategoryName, user_id: UserID) -> Result<Category, Error>;

    /// Get a category by its ID.
    fn get(&self, category_id: DatabaseID) -> Result<Category, Error>;

    /// Get all categories visible to a given user: their own plus the global
    /// ones, ordered by name.
    fn get_by_user(&self, user_id: UserID) -> Result<Vec<Category>, Error>;

    /// Rename the category with `category_id` belonging to `user_id`.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingCategory] if the category does not exist
    /// or belongs to another user.
    fn rename(
        &mut self,
        category_id: DatabaseID,
        user_id: UserID,
        name: CategoryName,
    ) -> Result<Category, Error>;

    /// Delete the category with `category_id` belonging to `user_id`.
    ///
    /// Global categories cannot be deleted.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingCategory] if the category does not exist,
    /// belongs to another user or is global.
    fn delete(&mut self, category_id: DatabaseID, user_id: UserID) -> Result<(), Error>;

    /// The name to display for an optional category reference.
    ///
    /// `None` covers all spending and displays as [OVERALL_CATEGORY]. A
    /// reference to a category that no longer exists displays as
    /// [UNKNOWN_CATEGORY].
    fn display_name(&self, category_id: Option<DatabaseID>) -> Result<String, Error> {
        match category_id {
            None => Ok(OVERALL_CATEGORY.to_string()),
            Some(category_id) => match self.get(category_id) {
                Ok(category) => Ok(category.name().to_string()),
                Err(Error::NotFound) => Ok(UNKNOWN_CATEGORY.to_string()),
                Err(error) => Err(error),
            },
        }
    }
}
