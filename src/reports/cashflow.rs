//! Reports that total spending and income over calendar periods.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;
use time::{Date, Month};

use crate::{
    Error,
    models::{DatabaseID, Direction, Ledger, Transaction, UserID},
    stores::{CategoryStore, SortOrder, TransactionQuery, TransactionStore},
};

/// A spending series over time with simple summary statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpendingTrend {
    /// Total spending per month, oldest first, keyed by the first day of the
    /// month. Months without spending are omitted.
    pub points: Vec<(Date, f64)>,
    /// The mean of the point totals, zero when there are no points.
    pub average: f64,
    /// The mean percentage change between consecutive months. `None` with
    /// fewer than two points; pairs whose earlier total is zero are left out
    /// of the mean.
    pub month_over_month: Option<f64>,
}

/// Income, spending and savings totals for one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonthlyCashFlow {
    /// The calendar month, where 1 is January.
    pub month: u8,
    /// Money earned within the month.
    pub income: f64,
    /// Debit spending within the month.
    pub expenses: f64,
    /// Income left over after spending. Negative when spending exceeded
    /// income.
    pub savings: f64,
    /// Savings as a share of income, rounded to one decimal place. Zero for
    /// months without income.
    pub savings_rate: f64,
}

/// A user's debit spending in `year`, bucketed by calendar month.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn monthly_spending<T>(store: &T, user_id: UserID, year: i32) -> Result<[f64; 12], Error>
where
    T: TransactionStore,
{
    let transactions = store.get_query(TransactionQuery {
        user_id: Some(user_id),
        ledger: Some(Ledger::Expense),
        direction: Some(Direction::Debit),
        date_range: Some(year_range(year)),
        ..Default::default()
    })?;

    Ok(monthly_totals(&transactions))
}

/// A user's income in `year`, bucketed by calendar month.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn monthly_income<T>(store: &T, user_id: UserID, year: i32) -> Result<[f64; 12], Error>
where
    T: TransactionStore,
{
    let transactions = store.get_query(TransactionQuery {
        user_id: Some(user_id),
        ledger: Some(Ledger::Income),
        date_range: Some(year_range(year)),
        ..Default::default()
    })?;

    Ok(monthly_totals(&transactions))
}

/// A user's debit spending in `year`, bucketed by calendar quarter.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn quarterly_spending<T>(store: &T, user_id: UserID, year: i32) -> Result<[f64; 4], Error>
where
    T: TransactionStore,
{
    Ok(quarterly_totals(monthly_spending(store, user_id, year)?))
}

/// A user's income in `year`, bucketed by calendar quarter.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn quarterly_income<T>(store: &T, user_id: UserID, year: i32) -> Result<[f64; 4], Error>
where
    T: TransactionStore,
{
    Ok(quarterly_totals(monthly_income(store, user_id, year)?))
}

/// A user's total debit spending for each year they have expenses in, in
/// increasing year order.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn yearly_spending<T>(store: &T, user_id: UserID) -> Result<Vec<(i32, f64)>, Error>
where
    T: TransactionStore,
{
    store
        .available_years(user_id, Ledger::Expense)?
        .into_iter()
        .map(|year| {
            let total = store.sum_amount(TransactionQuery {
                user_id: Some(user_id),
                ledger: Some(Ledger::Expense),
                direction: Some(Direction::Debit),
                date_range: Some(year_range(year)),
                ..Default::default()
            })?;

            Ok((year, total))
        })
        .collect()
}

/// A user's total income for each year they have income in, in increasing
/// year order.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn yearly_income<T>(store: &T, user_id: UserID) -> Result<Vec<(i32, f64)>, Error>
where
    T: TransactionStore,
{
    store
        .available_years(user_id, Ledger::Income)?
        .into_iter()
        .map(|year| {
            let total = store.sum_amount(TransactionQuery {
                user_id: Some(user_id),
                ledger: Some(Ledger::Income),
                date_range: Some(year_range(year)),
                ..Default::default()
            })?;

            Ok((year, total))
        })
        .collect()
}

/// A user's debit spending in `year` for each category, bucketed by calendar
/// month.
///
/// Every category visible to the user gets an entry, even without spending.
/// Uncategorised spending is keyed under `None`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn monthly_spending_by_category<T, C>(
    transaction_store: &T,
    category_store: &C,
    user_id: UserID,
    year: i32,
) -> Result<HashMap<Option<DatabaseID>, [f64; 12]>, Error>
where
    T: TransactionStore,
    C: CategoryStore,
{
    let mut totals: HashMap<Option<DatabaseID>, [f64; 12]> = category_store
        .get_by_user(user_id)?
        .iter()
        .map(|category| (Some(category.id()), [0.0; 12]))
        .collect();
    totals.insert(None, [0.0; 12]);

    let transactions = transaction_store.get_query(TransactionQuery {
        user_id: Some(user_id),
        ledger: Some(Ledger::Expense),
        direction: Some(Direction::Debit),
        date_range: Some(year_range(year)),
        ..Default::default()
    })?;

    for transaction in &transactions {
        // Spending in categories not visible to the user is dropped.
        if let Some(months) = totals.get_mut(&transaction.category_id()) {
            months[transaction.date().month() as usize - 1] += transaction.amount();
        }
    }

    Ok(totals)
}

/// A user's debit spending in `year` for each category, bucketed by calendar
/// quarter.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn quarterly_spending_by_category<T, C>(
    transaction_store: &T,
    category_store: &C,
    user_id: UserID,
    year: i32,
) -> Result<HashMap<Option<DatabaseID>, [f64; 4]>, Error>
where
    T: TransactionStore,
    C: CategoryStore,
{
    let totals = monthly_spending_by_category(transaction_store, category_store, user_id, year)?
        .into_iter()
        .map(|(category_id, months)| (category_id, quarterly_totals(months)))
        .collect();

    Ok(totals)
}

/// A user's total debit spending for each category, for each year they have
/// expenses in.
///
/// Years appear in increasing order and every category visible to the user
/// gets an entry for every year, even without spending.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn yearly_spending_by_category<T, C>(
    transaction_store: &T,
    category_store: &C,
    user_id: UserID,
) -> Result<HashMap<Option<DatabaseID>, Vec<(i32, f64)>>, Error>
where
    T: TransactionStore,
    C: CategoryStore,
{
    let mut totals: HashMap<Option<DatabaseID>, Vec<(i32, f64)>> = category_store
        .get_by_user(user_id)?
        .iter()
        .map(|category| (Some(category.id()), Vec::new()))
        .collect();
    totals.insert(None, Vec::new());

    for year in transaction_store.available_years(user_id, Ledger::Expense)? {
        let transactions = transaction_store.get_query(TransactionQuery {
            user_id: Some(user_id),
            ledger: Some(Ledger::Expense),
            direction: Some(Direction::Debit),
            date_range: Some(year_range(year)),
            ..Default::default()
        })?;

        let mut year_totals: HashMap<Option<DatabaseID>, f64> =
            totals.keys().map(|category_id| (*category_id, 0.0)).collect();

        for transaction in &transactions {
            if let Some(total) = year_totals.get_mut(&transaction.category_id()) {
                *total += transaction.amount();
            }
        }

        for (category_id, total) in year_totals {
            if let Some(years) = totals.get_mut(&category_id) {
                years.push((year, total));
            }
        }
    }

    Ok(totals)
}

/// A user's debit spending per month within `date_range`, with trend
/// statistics, optionally narrowed to one category.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn spending_trend<T>(
    store: &T,
    user_id: UserID,
    date_range: RangeInclusive<Date>,
    category_id: Option<DatabaseID>,
) -> Result<SpendingTrend, Error>
where
    T: TransactionStore,
{
    let transactions = store.get_query(TransactionQuery {
        user_id: Some(user_id),
        ledger: Some(Ledger::Expense),
        direction: Some(Direction::Debit),
        category_id,
        date_range: Some(date_range),
        sort_date: Some(SortOrder::Ascending),
        ..Default::default()
    })?;

    let mut points: Vec<(Date, f64)> = Vec::new();

    // The transactions arrive in date order, so each month's total is built
    // up while that month is the last point.
    for transaction in &transactions {
        let month = transaction
            .date()
            .replace_day(1)
            .expect("invalid month start date");

        match points.last_mut() {
            Some((last_month, total)) if *last_month == month => *total += transaction.amount(),
            _ => points.push((month, transaction.amount())),
        }
    }

    let average = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|(_, total)| total).sum::<f64>() / points.len() as f64
    };

    let changes: Vec<f64> = points
        .windows(2)
        .filter(|pair| pair[0].1 > 0.0)
        .map(|pair| (pair[1].1 - pair[0].1) / pair[0].1 * 100.0)
        .collect();
    let month_over_month = if changes.is_empty() {
        None
    } else {
        Some(changes.iter().sum::<f64>() / changes.len() as f64)
    };

    Ok(SpendingTrend {
        points,
        average,
        month_over_month,
    })
}

/// A month by month summary of a user's cash flow in `year`.
///
/// The summary always holds twelve entries, January through December.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn income_expense_summary<T>(
    store: &T,
    user_id: UserID,
    year: i32,
) -> Result<Vec<MonthlyCashFlow>, Error>
where
    T: TransactionStore,
{
    let income = monthly_income(store, user_id, year)?;
    let expenses = monthly_spending(store, user_id, year)?;

    let summary = income
        .iter()
        .zip(expenses.iter())
        .enumerate()
        .map(|(month, (income, expenses))| {
            let savings = income - expenses;
            let savings_rate = if *income > 0.0 {
                let rate = savings / income * 100.0;
                (rate * 10.0).round() / 10.0
            } else {
                0.0
            };

            MonthlyCashFlow {
                month: month as u8 + 1,
                income: *income,
                expenses: *expenses,
                savings,
                savings_rate,
            }
        })
        .collect();

    Ok(summary)
}

/// The first and last day of `year` as an inclusive range.
fn year_range(year: i32) -> RangeInclusive<Date> {
    let start = Date::from_calendar_date(year, Month::January, 1).expect("invalid year start date");
    let end = Date::from_calendar_date(year, Month::December, 31).expect("invalid year end date");

    start..=end
}

/// Bucket transaction amounts by calendar month.
fn monthly_totals(transactions: &[Transaction]) -> [f64; 12] {
    let mut totals = [0.0; 12];

    for transaction in transactions {
        totals[transaction.date().month() as usize - 1] += transaction.amount();
    }

    totals
}

/// Fold monthly totals into calendar quarters.
fn quarterly_totals(months: [f64; 12]) -> [f64; 4] {
    let mut totals = [0.0; 4];

    for (month, amount) in months.iter().enumerate() {
        totals[month / 3] += amount;
    }

    totals
}

#[cfg(test)]
mod quarterly_totals_tests {
    use super::quarterly_totals;

    #[test]
    fn folds_months_into_calendar_quarters() {
        let mut months = [0.0; 12];
        months[0] = 100.0;
        months[1] = 50.0;
        months[3] = 30.0;
        months[11] = 5.0;

        assert_eq!(quarterly_totals(months), [150.0, 30.0, 0.0, 5.0]);
    }
}

#[cfg(test)]
mod cash_flow_report_tests {
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use crate::{
        models::{CategoryName, DatabaseID, Direction, Transaction, UserID},
        stores::{
            CategoryStore, TransactionStore,
            sqlite::{SQLAppState, create_app_state},
        },
    };

    use super::{
        income_expense_summary, monthly_income, monthly_spending, monthly_spending_by_category,
        quarterly_spending, quarterly_spending_by_category, spending_trend, yearly_income,
        yearly_spending, yearly_spending_by_category,
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
    ) {
        state
            .transaction_store
            .create(
                Transaction::expense(amount, test_user())
                    .date(date)
                    .category(category_id),
            )
            .expect("could not create expense");
    }

    fn create_income(state: &mut SQLAppState, amount: f64, date: Date) {
        state
            .transaction_store
            .create(Transaction::income(amount, test_user()).date(date))
            .expect("could not create income");
    }

    #[test]
    fn monthly_spending_buckets_debits_by_month() {
        let mut state = get_app_state();
        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), None);
        create_expense(&mut state, 40.0, date!(2024 - 05 - 28), None);
        create_expense(&mut state, 25.0, date!(2024 - 06 - 03), None);
        // A refund, an income payment, another user's spending and another
        // year's spending should all be left out.
        state
            .transaction_store
            .create(
                Transaction::expense(30.0, test_user())
                    .date(date!(2024 - 05 - 11))
                    .direction(Direction::Credit),
            )
            .expect("could not create refund");
        create_income(&mut state, 1000.0, date!(2024 - 05 - 01));
        state
            .transaction_store
            .create(Transaction::expense(70.0, UserID::new(2)).date(date!(2024 - 05 - 12)))
            .expect("could not create other user's expense");
        create_expense(&mut state, 55.0, date!(2023 - 05 - 12), None);

        let spending = monthly_spending(&state.transaction_store, test_user(), 2024)
            .expect("could not total monthly spending");

        let mut want = [0.0; 12];
        want[4] = 140.0;
        want[5] = 25.0;
        assert_eq!(spending, want);
    }

    #[test]
    fn monthly_income_buckets_income_by_month() {
        let mut state = get_app_state();
        create_income(&mut state, 1000.0, date!(2024 - 05 - 01));
        create_income(&mut state, 500.0, date!(2024 - 06 - 01));
        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), None);

        let income = monthly_income(&state.transaction_store, test_user(), 2024)
            .expect("could not total monthly income");

        let mut want = [0.0; 12];
        want[4] = 1000.0;
        want[5] = 500.0;
        assert_eq!(income, want);
    }

    #[test]
    fn quarterly_spending_folds_monthly_totals() {
        let mut state = get_app_state();
        create_expense(&mut state, 100.0, date!(2024 - 01 - 15), None);
        create_expense(&mut state, 50.0, date!(2024 - 02 - 15), None);
        create_expense(&mut state, 30.0, date!(2024 - 04 - 15), None);

        let spending = quarterly_spending(&state.transaction_store, test_user(), 2024)
            .expect("could not total quarterly spending");

        assert_eq!(spending, [150.0, 30.0, 0.0, 0.0]);
    }

    #[test]
    fn yearly_spending_covers_every_year_with_expenses() {
        let mut state = get_app_state();
        create_expense(&mut state, 100.0, date!(2021 - 03 - 01), None);
        // A refund only: 2021 still shows up, but contributes nothing more.
        state
            .transaction_store
            .create(
                Transaction::expense(30.0, test_user())
                    .date(date!(2021 - 04 - 01))
                    .direction(Direction::Credit),
            )
            .expect("could not create refund");
        create_expense(&mut state, 40.0, date!(2023 - 07 - 01), None);

        let spending = yearly_spending(&state.transaction_store, test_user())
            .expect("could not total yearly spending");

        assert_eq!(spending, vec![(2021, 100.0), (2023, 40.0)]);
    }

    #[test]
    fn yearly_income_covers_every_year_with_income() {
        let mut state = get_app_state();
        create_income(&mut state, 1000.0, date!(2022 - 01 - 14));
        create_income(&mut state, 1000.0, date!(2022 - 01 - 28));
        create_expense(&mut state, 40.0, date!(2023 - 07 - 01), None);

        let income = yearly_income(&state.transaction_store, test_user())
            .expect("could not total yearly income");

        assert_eq!(income, vec![(2022, 2000.0)]);
    }

    #[test]
    fn monthly_spending_by_category_zero_fills_known_categories() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");
        let rent = state
            .category_store
            .create(CategoryName::new_unchecked("Rent"), test_user())
            .expect("could not create category");

        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), Some(groceries.id()));
        create_expense(&mut state, 25.0, date!(2024 - 06 - 03), None);

        let totals = monthly_spending_by_category(
            &state.transaction_store,
            &state.category_store,
            test_user(),
            2024,
        )
        .expect("could not total spending by category");

        assert_eq!(
            totals.len(),
            3,
            "want entries for both categories and uncategorised spending, got {}",
            totals.len()
        );

        let mut want_groceries = [0.0; 12];
        want_groceries[4] = 100.0;
        assert_eq!(totals.get(&Some(groceries.id())), Some(&want_groceries));

        assert_eq!(totals.get(&Some(rent.id())), Some(&[0.0; 12]));

        let mut want_uncategorised = [0.0; 12];
        want_uncategorised[5] = 25.0;
        assert_eq!(totals.get(&None), Some(&want_uncategorised));
    }

    #[test]
    fn quarterly_spending_by_category_folds_monthly_totals() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");

        create_expense(&mut state, 100.0, date!(2024 - 01 - 15), Some(groceries.id()));
        create_expense(&mut state, 50.0, date!(2024 - 02 - 15), Some(groceries.id()));
        create_expense(&mut state, 30.0, date!(2024 - 04 - 15), Some(groceries.id()));

        let totals = quarterly_spending_by_category(
            &state.transaction_store,
            &state.category_store,
            test_user(),
            2024,
        )
        .expect("could not total quarterly spending by category");

        assert_eq!(
            totals.get(&Some(groceries.id())),
            Some(&[150.0, 30.0, 0.0, 0.0])
        );
        assert_eq!(totals.get(&None), Some(&[0.0; 4]));
    }

    #[test]
    fn yearly_spending_by_category_zero_fills_years() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");

        create_expense(&mut state, 100.0, date!(2021 - 03 - 01), Some(groceries.id()));
        create_expense(&mut state, 10.0, date!(2023 - 07 - 01), None);

        let totals = yearly_spending_by_category(
            &state.transaction_store,
            &state.category_store,
            test_user(),
        )
        .expect("could not total yearly spending by category");

        assert_eq!(
            totals.get(&Some(groceries.id())),
            Some(&vec![(2021, 100.0), (2023, 0.0)])
        );
        assert_eq!(totals.get(&None), Some(&vec![(2021, 0.0), (2023, 10.0)]));
    }

    #[test]
    fn spending_trend_summarises_monthly_spending() {
        let mut state = get_app_state();
        create_expense(&mut state, 60.0, date!(2024 - 05 - 02), None);
        create_expense(&mut state, 40.0, date!(2024 - 05 - 20), None);
        create_expense(&mut state, 200.0, date!(2024 - 06 - 11), None);
        create_expense(&mut state, 300.0, date!(2024 - 07 - 03), None);

        let trend = spending_trend(
            &state.transaction_store,
            test_user(),
            date!(2024 - 05 - 01)..=date!(2024 - 07 - 31),
            None,
        )
        .expect("could not build spending trend");

        assert_eq!(
            trend.points,
            vec![
                (date!(2024 - 05 - 01), 100.0),
                (date!(2024 - 06 - 01), 200.0),
                (date!(2024 - 07 - 01), 300.0)
            ]
        );
        assert_eq!(trend.average, 200.0);
        assert_eq!(
            trend.month_over_month,
            Some(75.0),
            "spending rose 100% then 50%, averaging 75% month over month"
        );
    }

    #[test]
    fn spending_trend_narrows_to_one_category() {
        let mut state = get_app_state();
        let groceries = state
            .category_store
            .create(CategoryName::new_unchecked("Groceries"), test_user())
            .expect("could not create category");

        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), Some(groceries.id()));
        create_expense(&mut state, 50.0, date!(2024 - 05 - 12), None);

        let trend = spending_trend(
            &state.transaction_store,
            test_user(),
            date!(2024 - 05 - 01)..=date!(2024 - 05 - 31),
            Some(groceries.id()),
        )
        .expect("could not build spending trend");

        assert_eq!(trend.points, vec![(date!(2024 - 05 - 01), 100.0)]);
    }

    #[test]
    fn spending_trend_is_empty_without_spending() {
        let state = get_app_state();

        let trend = spending_trend(
            &state.transaction_store,
            test_user(),
            date!(2024 - 05 - 01)..=date!(2024 - 06 - 30),
            None,
        )
        .expect("could not build spending trend");

        assert_eq!(trend.points, Vec::new());
        assert_eq!(trend.average, 0.0);
        assert_eq!(trend.month_over_month, None);
    }

    #[test]
    fn spending_trend_needs_two_months_for_a_change() {
        let mut state = get_app_state();
        create_expense(&mut state, 100.0, date!(2024 - 05 - 10), None);

        let trend = spending_trend(
            &state.transaction_store,
            test_user(),
            date!(2024 - 05 - 01)..=date!(2024 - 06 - 30),
            None,
        )
        .expect("could not build spending trend");

        assert_eq!(trend.month_over_month, None);
    }

    #[test]
    fn income_expense_summary_reports_monthly_savings() {
        let mut state = get_app_state();
        create_expense(&mut state, 50.0, date!(2024 - 02 - 14), None);
        create_income(&mut state, 300.0, date!(2024 - 03 - 01));
        create_expense(&mut state, 100.0, date!(2024 - 03 - 15), None);
        create_income(&mut state, 1000.0, date!(2024 - 05 - 01));
        create_expense(&mut state, 400.0, date!(2024 - 05 - 20), None);

        let summary = income_expense_summary(&state.transaction_store, test_user(), 2024)
            .expect("could not build cash flow summary");

        assert_eq!(
            summary.len(),
            12,
            "want an entry for every month, got {}",
            summary.len()
        );
        assert_eq!(
            summary.iter().map(|entry| entry.month).collect::<Vec<_>>(),
            (1..=12).collect::<Vec<_>>()
        );

        let february = summary[1];
        assert_eq!(february.income, 0.0);
        assert_eq!(february.expenses, 50.0);
        assert_eq!(february.savings, -50.0);
        assert_eq!(
            february.savings_rate, 0.0,
            "months without income should read a zero savings rate"
        );

        let march = summary[2];
        assert_eq!(march.savings, 200.0);
        assert_eq!(
            march.savings_rate, 66.7,
            "the savings rate should round to one decimal place"
        );

        let may = summary[4];
        assert_eq!(may.income, 1000.0);
        assert_eq!(may.expenses, 400.0);
        assert_eq!(may.savings, 600.0);
        assert_eq!(may.savings_rate, 60.0);
    }
}
