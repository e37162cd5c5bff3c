//! Contains traits and implementations for objects that store the domain [models](crate::models).

mod budget;
mod category;
mod schedule;
mod transaction;

pub mod sqlite;

pub use budget::{BudgetStore, BudgetUpdate};
pub use category::{CategoryStore, OVERALL_CATEGORY, UNKNOWN_CATEGORY};
pub use schedule::{DueTemplate, ScheduleStore, TemplateUpdate};
pub use transaction::{SortOrder, TransactionQuery, TransactionStore};
