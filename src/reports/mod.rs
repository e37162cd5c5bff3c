//! Read-only reports over the ledger: budget performance and cash flow.

pub mod budget;
pub mod cashflow;

pub use budget::{
    BudgetPerformance, BudgetStatus, BudgetUsage, MonthlyBudgetTotals, budget_overview,
    historical_budget_performance, monthly_budget_performance,
};
pub use cashflow::{
    MonthlyCashFlow, SpendingTrend, income_expense_summary, monthly_income, monthly_spending,
    monthly_spending_by_category, quarterly_income, quarterly_spending,
    quarterly_spending_by_category, spending_trend, yearly_income, yearly_spending,
    yearly_spending_by_category,
};
