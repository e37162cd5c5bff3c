//! The schedule driver that turns due recurring templates into transactions.

use serde::Serialize;
use time::Date;

use crate::{Error, stores::ScheduleStore};

/// The outcome of one scheduler run.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ScheduleRun {
    /// How many due templates the run scanned.
    pub scanned: usize,
    /// How many transactions the run created.
    pub created: usize,
    /// How many series the run marked exhausted.
    pub exhausted: usize,
    /// How many templates were retired because their stored schedule was
    /// unusable.
    pub faults: usize,
}

/// Create the transactions of every schedule that has come due by `today`.
///
/// Each due template is caught up in one run: a template that is several
/// occurrences behind has all of them created, each dated the day it was due
/// rather than today. A series is marked exhausted once its next occurrence
/// would land after its end date.
///
/// # Errors
/// Returns any store error. A run that fails part way through leaves the
/// completed occurrences committed, and rerunning the scheduler picks up
/// where it left off.
pub fn process_due_templates<S>(store: &mut S, today: Date) -> Result<ScheduleRun, Error>
where
    S: ScheduleStore,
{
    let templates = store.due_templates(today)?;

    let mut run = ScheduleRun {
        scanned: templates.len(),
        ..Default::default()
    };

    for template in templates {
        let Some(frequency) = template.frequency else {
            tracing::warn!(
                "retiring schedule template {} with an unusable frequency",
                template.id
            );
            store.exhaust_template(template.id)?;
            run.faults += 1;
            continue;
        };

        // The cursor can sit past the end date when a series was created or
        // edited to end before its next repeat. Retire it instead of
        // materializing past the end.
        if let Some(end_date) = template.end_date {
            if template.next_due > end_date {
                tracing::debug!(
                    "retiring schedule template {}: cursor {} is past end date {}",
                    template.id,
                    template.next_due,
                    end_date
                );
                store.exhaust_template(template.id)?;
                run.exhausted += 1;
                continue;
            }
        }

        // Monthly schedules without an explicit anchor day are anchored to
        // the day of the template's date, so a series started on the 31st
        // returns to the 31st after a short month.
        let frequency = frequency.with_anchor_from(template.date);
        let mut due = template.next_due;

        loop {
            let candidate = frequency.next_occurrence(due);
            let next_due = match template.end_date {
                Some(end_date) if candidate > end_date => None,
                _ => Some(candidate),
            };

            let transaction = store.materialize_occurrence(&template, due, next_due)?;
            run.created += 1;
            tracing::info!(
                "created occurrence {} of template {} dated {}",
                transaction.id(),
                template.id,
                due
            );

            match next_due {
                Some(next) if next <= today => due = next,
                Some(_) => break,
                None => {
                    run.exhausted += 1;
                    break;
                }
            }
        }
    }

    tracing::info!(
        "schedule run complete: scanned {}, created {}, exhausted {}, faults {}",
        run.scanned,
        run.created,
        run.exhausted,
        run.faults
    );

    Ok(run)
}
