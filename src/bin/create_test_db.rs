use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use money_tracker::{
    models::{
        BudgetBuilder, BudgetPeriod, CategoryName, Frequency, RecurrenceRule, Transaction, UserID,
    },
    process_due_templates,
    stores::{BudgetStore, CategoryStore, TransactionStore, sqlite::create_app_state},
};

/// A utility for creating a test database for money_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;
    let mut state = create_app_state(connection)?;

    let user_id = UserID::new(1);
    let today = OffsetDateTime::now_utc().date();

    println!("Creating test categories...");
    let groceries = state
        .category_store
        .create(CategoryName::new("Groceries")?, user_id)?;
    let rent = state
        .category_store
        .create(CategoryName::new("Rent")?, user_id)?;

    println!("Creating test transactions...");
    state.transaction_store.create(
        Transaction::expense(52.35, user_id)
            .description("Weekly shop")
            .category(Some(groceries.id())),
    )?;
    state
        .transaction_store
        .create(Transaction::income(150.0, user_id).description("Tax refund"))?;

    println!("Creating recurring transactions...");
    // Dated in the past so the catch-up run below has occurrences to create.
    let rent_start = today.saturating_sub(Duration::days(45)).replace_day(1)?;
    state.transaction_store.create(
        Transaction::expense(1800.0, user_id)
            .date(rent_start)
            .description("Rent")
            .category(Some(rent.id()))
            .recurring(RecurrenceRule::new(
                Frequency::Monthly {
                    anchor_day: Some(1),
                },
                None,
            )?),
    )?;
    state.transaction_store.create(
        Transaction::income(2600.0, user_id)
            .date(today.saturating_sub(Duration::days(42)))
            .description("Salary")
            .recurring(RecurrenceRule::new(Frequency::Biweekly, None)?),
    )?;

    println!("Creating test budgets...");
    state.budget_store.create(
        BudgetBuilder::new("Food", 400.0, BudgetPeriod::Monthly, user_id)
            .category(Some(groceries.id())),
    )?;
    state.budget_store.create(BudgetBuilder::new(
        "Everything",
        3000.0,
        BudgetPeriod::Monthly,
        user_id,
    ))?;

    println!("Processing due recurring transactions...");
    let run = process_due_templates(&mut state.schedule_store, today)?;
    println!("{}", serde_json::to_string_pretty(&run)?);

    println!("Success!");

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty().with_filter(filter))
        .init();
}
