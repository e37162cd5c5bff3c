//! Reports that measure spending against budgets.

use std::ops::RangeInclusive;

use serde::Serialize;
use time::{Date, Month};

use crate::{
    Error,
    models::{Budget, BudgetPeriod, DatabaseID, Direction, Ledger, UserID, last_day_of_month},
    stores::{BudgetStore, CategoryStore, TransactionQuery, TransactionStore},
};

/// How much of a budget's amount has been used.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BudgetUsage {
    /// The total debit spending within the reported window and the budget's
    /// category.
    pub spent: f64,
    /// The amount left to spend. Zero when the budget is overspent.
    pub remaining: f64,
    /// The share of the budget spent as a whole percentage, capped at 100.
    pub percentage_used: u8,
}

/// A budget's usage at a point in time, with its notification state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// The ID of the budget.
    pub budget_id: DatabaseID,
    /// The display name of the budget.
    pub name: String,
    /// How much of the budget has been used.
    pub usage: BudgetUsage,
    /// Whether usage has reached the budget's notification threshold.
    pub over_threshold: bool,
}

/// A budget's performance, reported for one calendar month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetPerformance {
    /// The ID of the budget.
    pub budget_id: DatabaseID,
    /// The display name of the budget.
    pub name: String,
    /// The category of spending the budget covers, if it covers just one.
    pub category_id: Option<DatabaseID>,
    /// The display name of the category. Budgets covering all spending read
    /// "Overall" and categories that no longer exist read "Unknown".
    pub category_name: String,
    /// The maximum amount to spend within the budget's window.
    pub budget_amount: f64,
    /// How much of the budget has been used within the report month.
    pub usage: BudgetUsage,
    /// How long the budget's window runs for.
    pub period: BudgetPeriod,
    /// The first day of the budget's window.
    pub start_date: Date,
    /// The last day (inclusive) of the budget's window.
    pub end_date: Date,
}

/// The combined performance of all budgets within one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonthlyBudgetTotals {
    /// The calendar month, 1 through 12.
    pub month: u8,
    /// The sum of the amounts of the budgets overlapping the month.
    pub total_budgeted: f64,
    /// All debit spending within the month, regardless of category.
    pub total_spent: f64,
    /// The budgeted amount left unspent. Zero when overspent.
    pub remaining: f64,
    /// The share of the budgeted amount spent, as a percentage. Unlike
    /// [BudgetUsage::percentage_used] the value is not capped, so overspent
    /// months read above 100.
    pub percentage: f64,
}

/// The usage of every active budget covering `date`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn budget_overview<T, B>(
    transaction_store: &T,
    budget_store: &B,
    user_id: UserID,
    date: Date,
) -> Result<Vec<BudgetStatus>, Error>
where
    T: TransactionStore,
    B: BudgetStore,
{
    budget_store
        .active_covering(user_id, date)?
        .iter()
        .map(|budget| {
            let window = budget.start_date()..=budget.end_date();
            let usage = usage(transaction_store, budget, window)?;

            Ok(BudgetStatus {
                budget_id: budget.id(),
                name: budget.name().to_string(),
                over_threshold: usage.percentage_used >= budget.notification_threshold(),
                usage,
            })
        })
        .collect()
}

/// The performance of every active budget whose window overlaps the given
/// calendar month.
///
/// Spending is measured within the report month, so a budget whose window
/// reaches outside the month only counts that month's spending against it.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn monthly_budget_performance<T, B, C>(
    transaction_store: &T,
    budget_store: &B,
    category_store: &C,
    user_id: UserID,
    year: i32,
    month: Month,
) -> Result<Vec<BudgetPerformance>, Error>
where
    T: TransactionStore,
    B: BudgetStore,
    C: CategoryStore,
{
    budget_store
        .overlapping(user_id, month_range(year, month), true)?
        .iter()
        .map(|budget| {
            Ok(BudgetPerformance {
                budget_id: budget.id(),
                name: budget.name().to_string(),
                category_id: budget.category_id(),
                category_name: category_store.display_name(budget.category_id())?,
                budget_amount: budget.amount(),
                usage: usage(transaction_store, budget, month_range(year, month))?,
                period: budget.period(),
                start_date: budget.start_date(),
                end_date: budget.end_date(),
            })
        })
        .collect()
}

/// The combined budget performance of every calendar month of `year`,
/// January through December.
///
/// Every budget overlapping a month is counted whether active or not, and
/// spending is all of the month's debit spending regardless of category. A
/// month with no budgets reads as zero percent used.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn historical_budget_performance<T, B>(
    transaction_store: &T,
    budget_store: &B,
    user_id: UserID,
    year: i32,
) -> Result<Vec<MonthlyBudgetTotals>, Error>
where
    T: TransactionStore,
    B: BudgetStore,
{
    let mut totals = Vec::with_capacity(12);

    for number in 1..=12u8 {
        let month = Month::try_from(number).expect("invalid month number");
        let budgets = budget_store.overlapping(user_id, month_range(year, month), false)?;
        let total_budgeted: f64 = budgets.iter().map(Budget::amount).sum();

        let total_spent = transaction_store.sum_amount(TransactionQuery {
            user_id: Some(user_id),
            ledger: Some(Ledger::Expense),
            direction: Some(Direction::Debit),
            date_range: Some(month_range(year, month)),
            ..Default::default()
        })?;

        let percentage = if total_budgeted > 0.0 {
            total_spent / total_budgeted * 100.0
        } else {
            0.0
        };

        totals.push(MonthlyBudgetTotals {
            month: number,
            total_budgeted,
            total_spent,
            remaining: (total_budgeted - total_spent).max(0.0),
            percentage,
        });
    }

    Ok(totals)
}

/// Measure spending against `budget`'s category over `window`.
fn usage<T>(
    transaction_store: &T,
    budget: &Budget,
    window: RangeInclusive<Date>,
) -> Result<BudgetUsage, Error>
where
    T: TransactionStore,
{
    let spent = transaction_store.sum_amount(TransactionQuery {
        user_id: Some(budget.user_id()),
        ledger: Some(Ledger::Expense),
        direction: Some(Direction::Debit),
        category_id: budget.category_id(),
        date_range: Some(window),
        ..Default::default()
    })?;

    Ok(BudgetUsage {
        spent,
        remaining: (budget.amount() - spent).max(0.0),
        percentage_used: percentage_used(spent, budget.amount()),
    })
}

/// The share of `amount` spent as a whole percentage, capped at 100.
///
/// A budget for zero reads as 0% used rather than dividing by zero.
fn percentage_used(spent: f64, amount: f64) -> u8 {
    if amount <= 0.0 {
        return 0;
    }

    (spent / amount * 100.0).round().min(100.0) as u8
}

/// The first and last day of the given month, as an inclusive range.
fn month_range(year: i32, month: Month) -> RangeInclusive<Date> {
    let start = Date::from_calendar_date(year, month, 1).expect("invalid month start date");
    let end = Date::from_calendar_date(year, month, last_day_of_month(year, month))
        .expect("invalid month end date");

    start..=end
}

#[cfg(test)]
mod percentage_used_tests {
    use super::percentage_used;

    #[test]
    fn rounds_to_nearest_whole_percent() {
        assert_eq!(percentage_used(87.5, 100.0), 88);
        assert_eq!(percentage_used(12.4, 100.0), 12);
    }

    #[test]
    fn caps_overspending_at_one_hundred() {
        assert_eq!(percentage_used(500.0, 400.0), 100);
    }

    #[test]
    fn budget_for_zero_reads_as_zero() {
        assert_eq!(percentage_used(50.0, 0.0), 0);
    }
}

#[cfg(test)]
mod budget_report_tests {
    use rusqlite::Connection;
    use time::{Date, Month, macros::date};

    use crate::{
        models::{BudgetBuilder, BudgetPeriod, CategoryName, DatabaseID, Transaction, UserID},
        stores::{
            BudgetStore, CategoryStore, TransactionStore,
            sqlite::{SQLAppState, create_app_state},
        },
    };

    use super::{
        BudgetUsage, budget_overview, historical_budget_performance, monthly_budget_performance,
    };

    fn get_app_state() -> SQLAppState {
        let connection =
            Connection::open_in_memory().expect("could not create in-memory SQLite database");

        create_app_state(connection).expect("could not create app state")
    }

    fn test_user() -> UserID {
        UserID::new(1)
    }

    fn create_expense(
        state: &mut SQLAppState,
        amount: f64,
        date: Date,
        category_id: Option<DatabaseID>,
    ) -> Transaction {
        state
            .transaction_store
            .create(
                Transaction::expense(amount, test_user())
                    .date(date)
                    .category(category_id),
            )
            .expect("could not create expense")
    }

    #[test]
    fn budget_overview_flags_budgets_over_their_threshold() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");
        let fun = state
            .category_store
            .create(CategoryName::new_unchecked("Fun"), test_user())
            .expect("could not create category");

        let food_budget = state
            .budget_store
            .create(
                BudgetBuilder::new("Food", 400.0, BudgetPeriod::Monthly, test_user())
                    .category(Some(groceries.id()))
                    .start_date(date!(2024 - 05 - 01)),
            )
            .expect("could not create budget");
        state
            .budget_store
            .create(
                BudgetBuilder::new("Fun", 200.0, BudgetPeriod::Monthly, test_user())
                    .category(Some(fun.id()))
                    .start_date(date!(2024 - 05 - 01))
                    .notification_threshold(90),
            )
            .expect("could not create budget");

        create_expense(&mut state, 350.0, date!(2024 - 05 - 10), Some(groceries.id()));
        create_expense(&mut state, 60.0, date!(2024 - 05 - 12), Some(fun.id()));

        let overview = budget_overview(
            &state.transaction_store,
            &state.budget_store,
            test_user(),
            date!(2024 - 05 - 15),
        )
        .expect("could not build budget overview");

        assert_eq!(
            overview.len(),
            2,
            "want 2 budget statuses, got {}",
            overview.len()
        );

        let food_status = overview
            .iter()
            .find(|status| status.budget_id == food_budget.id())
            .expect("food budget missing from overview");
        assert_eq!(
            food_status.usage,
            BudgetUsage {
                spent: 350.0,
                remaining: 50.0,
                percentage_used: 88,
            }
        );
        assert!(
            food_status.over_threshold,
            "88% usage should be flagged against an 80% threshold"
        );

        let fun_status = overview
            .iter()
            .find(|status| status.name == "Fun")
            .expect("fun budget missing from overview");
        assert_eq!(fun_status.usage.percentage_used, 30);
        assert!(
            !fun_status.over_threshold,
            "30% usage should not be flagged against a 90% threshold"
        );
    }

    #[test]
    fn monthly_performance_caps_overspent_budgets() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");
        state
            .budget_store
            .create(
                BudgetBuilder::new("Food", 400.0, BudgetPeriod::Monthly, test_user())
                    .category(Some(groceries.id()))
                    .start_date(date!(2024 - 05 - 01)),
            )
            .expect("could not create budget");

        create_expense(&mut state, 300.0, date!(2024 - 05 - 04), Some(groceries.id()));
        create_expense(&mut state, 200.0, date!(2024 - 05 - 20), Some(groceries.id()));
        // Outside the report month.
        create_expense(&mut state, 70.0, date!(2024 - 06 - 02), Some(groceries.id()));

        let performance = monthly_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            &state.category_store,
            test_user(),
            2024,
            Month::May,
        )
        .expect("could not build monthly budget performance");

        assert_eq!(
            performance.len(),
            1,
            "want 1 budget performance entry, got {}",
            performance.len()
        );
        assert_eq!(performance[0].name, "Food");
        assert_eq!(performance[0].category_name, "Groceries");
        assert_eq!(performance[0].budget_amount, 400.0);
        assert_eq!(
            performance[0].usage,
            BudgetUsage {
                spent: 500.0,
                remaining: 0.0,
                percentage_used: 100,
            }
        );
        assert_eq!(performance[0].start_date, date!(2024 - 05 - 01));
        assert_eq!(performance[0].end_date, date!(2024 - 05 - 31));
    }

    #[test]
    fn monthly_performance_names_overall_and_missing_categories() {
        let mut state = get_app_state();
        let temp = state
            .category_store
            .create(CategoryName::new_unchecked("Temp"), test_user())
            .expect("could not create category");

        state
            .budget_store
            .create(
                BudgetBuilder::new("Everything", 1000.0, BudgetPeriod::Monthly, test_user())
                    .start_date(date!(2024 - 05 - 01)),
            )
            .expect("could not create budget");
        state
            .budget_store
            .create(
                BudgetBuilder::new("Stale", 100.0, BudgetPeriod::Monthly, test_user())
                    .category(Some(temp.id()))
                    .start_date(date!(2024 - 05 - 01)),
            )
            .expect("could not create budget");

        state
            .category_store
            .delete(temp.id(), test_user())
            .expect("could not delete category");

        let performance = monthly_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            &state.category_store,
            test_user(),
            2024,
            Month::May,
        )
        .expect("could not build monthly budget performance");

        let overall = performance
            .iter()
            .find(|entry| entry.name == "Everything")
            .expect("overall budget missing from report");
        assert_eq!(overall.category_name, "Overall");

        let stale = performance
            .iter()
            .find(|entry| entry.name == "Stale")
            .expect("stale budget missing from report");
        assert_eq!(stale.category_name, "Unknown");
    }

    #[test]
    fn monthly_performance_measures_spending_within_the_month() {
        let mut state = get_app_state();
        state
            .budget_store
            .create(
                BudgetBuilder::new("Spring", 900.0, BudgetPeriod::Quarterly, test_user())
                    .start_date(date!(2024 - 04 - 15)),
            )
            .expect("could not create budget");

        // Inside the budget's window but outside the report month.
        create_expense(&mut state, 400.0, date!(2024 - 04 - 20), None);
        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), None);

        let performance = monthly_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            &state.category_store,
            test_user(),
            2024,
            Month::May,
        )
        .expect("could not build monthly budget performance");

        assert_eq!(performance.len(), 1);
        assert_eq!(
            performance[0].usage.spent,
            100.0,
            "only the report month's spending should count against the budget"
        );
    }

    #[test]
    fn monthly_performance_includes_overlapping_windows_only() {
        let mut state = get_app_state();
        state
            .budget_store
            .create(
                BudgetBuilder::new("Spring", 900.0, BudgetPeriod::Quarterly, test_user())
                    .start_date(date!(2024 - 04 - 15)),
            )
            .expect("could not create budget");
        state
            .budget_store
            .create(
                BudgetBuilder::new("January", 500.0, BudgetPeriod::Monthly, test_user())
                    .start_date(date!(2024 - 01 - 01)),
            )
            .expect("could not create budget");

        let performance = monthly_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            &state.category_store,
            test_user(),
            2024,
            Month::May,
        )
        .expect("could not build monthly budget performance");

        assert_eq!(
            performance.len(),
            1,
            "only the quarterly budget overlaps May"
        );
        assert_eq!(performance[0].name, "Spring");
    }

    #[test]
    fn historical_performance_reports_every_month_uncapped() {
        let mut state = get_app_state();
        state
            .budget_store
            .create(
                BudgetBuilder::new("Everything", 400.0, BudgetPeriod::Monthly, test_user())
                    .start_date(date!(2024 - 05 - 01)),
            )
            .expect("could not create budget");

        create_expense(&mut state, 500.0, date!(2024 - 05 - 10), None);
        create_expense(&mut state, 100.0, date!(2024 - 04 - 10), None);

        let history = historical_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            test_user(),
            2024,
        )
        .expect("could not build budget history");

        assert_eq!(
            history.len(),
            12,
            "want 12 months of history, got {}",
            history.len()
        );
        let months: Vec<u8> = history.iter().map(|totals| totals.month).collect();
        assert_eq!(months, (1..=12).collect::<Vec<u8>>());

        let april = &history[3];
        assert_eq!(april.total_budgeted, 0.0);
        assert_eq!(
            april.total_spent, 100.0,
            "months without budgets still report their spending"
        );
        assert_eq!(april.percentage, 0.0);

        let may = &history[4];
        assert_eq!(may.total_budgeted, 400.0);
        assert_eq!(may.total_spent, 500.0);
        assert_eq!(may.remaining, 0.0);
        assert_eq!(
            may.percentage, 125.0,
            "overspent months should read above 100%"
        );

        assert_eq!(history[5].total_spent, 0.0);
    }

    #[test]
    fn historical_performance_counts_inactive_budgets_and_month_spending() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");
        let budget = state
            .budget_store
            .create(
                BudgetBuilder::new("Spring food", 600.0, BudgetPeriod::Monthly, test_user())
                    .category(Some(groceries.id()))
                    .start_date(date!(2024 - 04 - 15))
                    .end_date(date!(2024 - 06 - 14)),
            )
            .expect("could not create budget");
        state
            .budget_store
            .deactivate(budget.id(), test_user())
            .expect("could not deactivate budget");

        // Uncategorised, so it counts toward the month but not the budget.
        create_expense(&mut state, 100.0, date!(2024 - 04 - 10), None);

        let history = historical_budget_performance(
            &state.transaction_store,
            &state.budget_store,
            test_user(),
            2024,
        )
        .expect("could not build budget history");

        let april = &history[3];
        assert_eq!(
            april.total_budgeted, 600.0,
            "inactive budgets still count towards history"
        );
        assert_eq!(
            april.total_spent, 100.0,
            "history should measure all of the month's spending"
        );

        let march = &history[2];
        assert_eq!(
            march.total_budgeted, 0.0,
            "the budget does not overlap March"
        );
    }
}
