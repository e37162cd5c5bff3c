//! Defines the store trait for recurring transaction templates.

use time::Date;

use crate::{
    Error,
    models::{DatabaseID, Direction, Frequency, Ledger, Transaction, UserID},
};

/// A recurring transaction template whose cursor has come due.
///
/// This is the scheduler's working view of a template: the fields needed to
/// copy the template into a new ledger row plus the cursor to advance.
#[derive(Debug, Clone, PartialEq)]
pub struct DueTemplate {
    /// The ID of the template transaction.
    pub id: DatabaseID,
    /// The amount of money each occurrence moves.
    pub amount: f64,
    /// The description of the template, without the recurring suffix.
    pub description: String,
    /// Whether the series records expenses or income.
    pub ledger: Ledger,
    /// The direction of each occurrence, if the ledger distinguishes one.
    pub direction: Option<Direction>,
    /// The category each occurrence is assigned to.
    pub category_id: Option<DatabaseID>,
    /// The user that owns the series.
    pub user_id: UserID,
    /// The date the series took effect. Monthly schedules take their anchor
    /// day from this date when none was set explicitly.
    pub date: Date,
    /// How often the series repeats. `None` means the stored frequency code
    /// was not recognised and the template cannot be processed.
    pub frequency: Option<Frequency>,
    /// The last date (inclusive) the series may create occurrences on.
    pub end_date: Option<Date>,
    /// The next date the series is due.
    pub next_due: Date,
}

/// A partial update to a recurring transaction template.
///
/// `None` fields keep their current value. The doubled options distinguish
/// "leave unchanged" (`None`) from "clear the value" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    /// Replace the amount of money each occurrence moves.
    pub amount: Option<f64>,
    /// Replace the description of the template.
    pub description: Option<String>,
    /// Replace or clear the category each occurrence is assigned to.
    pub category_id: Option<Option<DatabaseID>>,
    /// Replace how often the series repeats.
    pub frequency: Option<Frequency>,
    /// Replace or clear the last date the series may create occurrences on.
    pub end_date: Option<Option<Date>>,
}

/// Handles the schedule state of recurring transaction templates.
///
/// Templates are ordinary rows in the transaction store. This trait covers
/// the extra state that makes them recur and the operations the scheduler
/// drives them with.
pub trait ScheduleStore {
    /// Retrieve the templates whose next due date falls on or before `date`,
    /// ordered by due date.
    ///
    /// Exhausted templates (those with no next due date) are not returned.
    fn due_templates(&self, date: Date) -> Result<Vec<DueTemplate>, Error>;

    /// Create the occurrence of `template` dated `occurrence_date` and move
    /// the template's cursor to `next_due`.
    ///
    /// A `next_due` of `None` marks the series exhausted. The new transaction
    /// copies the template's fields, appends a recurring marker to the
    /// description, and records the template as its origin.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the template was deleted since it was
    /// scanned. No occurrence is created in that case.
    fn materialize_occurrence(
        &mut self,
        template: &DueTemplate,
        occurrence_date: Date,
        next_due: Option<Date>,
    ) -> Result<Transaction, Error>;

    /// Mark the template's series exhausted so it is never scanned again.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no template with `template_id` exists.
    fn exhaust_template(&mut self, template_id: DatabaseID) -> Result<(), Error>;

    /// Retrieve all of a user's recurring transaction templates, ordered by
    /// next due date.
    fn recurring_templates(&self, user_id: UserID) -> Result<Vec<Transaction>, Error>;

    /// Apply `update` to the template with `id` belonging to `user_id` and
    /// recompute its next due date.
    ///
    /// The cursor is recomputed from the old next due date. Updating an
    /// exhausted series revives it, stepping from the latest occurrence the
    /// series created (or from the template's own date when it created
    /// none) so no occurrence is repeated.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if no transaction with `id` belongs to `user_id`,
    /// - [Error::NotRecurring] if the transaction is not a usable template
    ///   and the update does not set a frequency,
    /// - [Error::FrequencyNotAvailable] if the new frequency is not offered
    ///   on the template's ledger,
    /// - [Error::InvalidAnchorDay] if the new frequency's anchor day is
    ///   outside 1-31,
    /// - [Error::NegativeAmount] if the new amount is negative,
    /// - [Error::EndDateBeforeStart] if the new end date does not fall after
    ///   the template's date,
    /// - or [Error::InvalidCategory] if the new category does not exist.
    fn update_template(
        &mut self,
        id: DatabaseID,
        user_id: UserID,
        update: TemplateUpdate,
    ) -> Result<Transaction, Error>;

    /// Delete the template with `id` belonging to `user_id` along with its
    /// occurrences dated `today` or later.
    ///
    /// Occurrences dated before `today` stay in the ledger as history.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if no transaction with `id` belongs to `user_id`,
    /// - or [Error::NotRecurring] if the transaction is not a template.
    fn delete_series(&mut self, id: DatabaseID, user_id: UserID, today: Date)
    -> Result<(), Error>;
}
