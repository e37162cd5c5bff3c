//! This file defines the recurrence rule attached to schedule templates and
//! the calendar arithmetic that advances a schedule from one occurrence to
//! the next.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

/// The error returned when the frequency stored in the database does not
/// reassemble into a usable [Frequency].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrequencyError {
    /// The stored code does not map to a known frequency.
    #[error("{0} is not a valid frequency code")]
    UnknownCode(i64),
    /// The stored monthly anchor day is outside 1-31.
    #[error("{0} is not a valid monthly anchor day")]
    InvalidAnchorDay(u8),
}

/// How often a schedule template generates a new transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every fourteen days.
    Biweekly,
    /// Every calendar month.
    Monthly {
        /// The day of the month each occurrence aims for. Occurrences are
        /// clamped to the last day of months that are too short. `None` means
        /// the day is taken from the date being advanced.
        anchor_day: Option<u8>,
    },
    /// Every calendar year.
    Yearly,
}

impl Frequency {
    /// The integer code the frequency is stored under in the database.
    pub fn code(&self) -> i64 {
        match self {
            Frequency::Daily => 0,
            Frequency::Weekly => 1,
            Frequency::Biweekly => 2,
            Frequency::Monthly { .. } => 3,
            Frequency::Yearly => 4,
        }
    }

    /// Reassemble a frequency from its database form.
    ///
    /// # Errors
    /// Returns a [FrequencyError] if `code` is not a known frequency code or
    /// a monthly anchor day is outside 1-31.
    pub fn from_parts(code: i64, anchor_day: Option<u8>) -> Result<Self, FrequencyError> {
        match code {
            0 => Ok(Frequency::Daily),
            1 => Ok(Frequency::Weekly),
            2 => Ok(Frequency::Biweekly),
            3 => {
                if let Some(anchor_day) = anchor_day {
                    if !(1..=31).contains(&anchor_day) {
                        return Err(FrequencyError::InvalidAnchorDay(anchor_day));
                    }
                }

                Ok(Frequency::Monthly { anchor_day })
            }
            4 => Ok(Frequency::Yearly),
            _ => Err(FrequencyError::UnknownCode(code)),
        }
    }

    /// The anchor day for monthly frequencies, `None` otherwise.
    pub fn anchor_day(&self) -> Option<u8> {
        match self {
            Frequency::Monthly { anchor_day } => *anchor_day,
            _ => None,
        }
    }

    /// The frequency with a monthly anchor day filled in from `date` when
    /// none was set.
    ///
    /// Advancing a monthly schedule from a clamped occurrence (e.g. February
    /// 29th) without an anchor would lose the original day of the month, so
    /// callers that advance schedules repeatedly should anchor them to the
    /// date the series took effect.
    pub fn with_anchor_from(&self, date: Date) -> Frequency {
        match self {
            Frequency::Monthly { anchor_day: None } => Frequency::Monthly {
                anchor_day: Some(date.day()),
            },
            frequency => *frequency,
        }
    }

    /// The date of the occurrence that follows an occurrence on `date`.
    ///
    /// Monthly schedules aim for the anchor day and clamp to the last day of
    /// months that are too short, so a schedule anchored on the 31st lands on
    /// February 29th in a leap year and back on March 31st the month after.
    /// Yearly schedules starting on February 29th fall on March 1st in
    /// non-leap years.
    pub fn next_occurrence(&self, date: Date) -> Date {
        match self {
            Frequency::Daily => date.saturating_add(Duration::days(1)),
            Frequency::Weekly => date.saturating_add(Duration::weeks(1)),
            Frequency::Biweekly => date.saturating_add(Duration::weeks(2)),
            Frequency::Monthly { anchor_day } => {
                let (year, month) = match date.month() {
                    Month::December => (date.year() + 1, Month::January),
                    month => (date.year(), month.next()),
                };
                let day = anchor_day
                    .unwrap_or(date.day())
                    .min(last_day_of_month(year, month));

                Date::from_calendar_date(year, month, day).expect("invalid clamped monthly date")
            }
            Frequency::Yearly => {
                Date::from_calendar_date(date.year() + 1, date.month(), date.day()).unwrap_or_else(
                    |_| {
                        Date::from_calendar_date(date.year() + 1, Month::March, 1)
                            .expect("invalid leap day fallback date")
                    },
                )
            }
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly { .. } => "monthly",
            Frequency::Yearly => "yearly",
        };

        write!(f, "{name}")
    }
}

/// Get the number for the last day of the month for the given `year` and `month`.
pub(crate) fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Describes how a schedule template repeats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    frequency: Frequency,
    end_date: Option<Date>,
}

impl RecurrenceRule {
    /// Create a rule that repeats with `frequency` until `end_date`
    /// (inclusive), or indefinitely when `end_date` is `None`.
    ///
    /// # Errors
    /// This function will return an [Error::InvalidAnchorDay] if a monthly
    /// anchor day is outside 1-31.
    pub fn new(frequency: Frequency, end_date: Option<Date>) -> Result<Self, Error> {
        if let Some(anchor_day) = frequency.anchor_day() {
            if !(1..=31).contains(&anchor_day) {
                return Err(Error::InvalidAnchorDay(anchor_day));
            }
        }

        Ok(Self {
            frequency,
            end_date,
        })
    }

    /// Create a rule without validating the anchor day.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the anchor day invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(frequency: Frequency, end_date: Option<Date>) -> Self {
        Self {
            frequency,
            end_date,
        }
    }

    /// How often the schedule repeats.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// The last date (inclusive) on which an occurrence may fall.
    pub fn end_date(&self) -> Option<Date> {
        self.end_date
    }
}

/// The stored schedule state of a template: its rule plus the cursor that
/// tracks where the series is up to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    rule: RecurrenceRule,
    next_due: Option<Date>,
    occurrence_count: i64,
}

impl Recurrence {
    /// Reassemble schedule state from its database form.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the schedule invariants are violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(
        rule: RecurrenceRule,
        next_due: Option<Date>,
        occurrence_count: i64,
    ) -> Self {
        Self {
            rule,
            next_due,
            occurrence_count,
        }
    }

    /// The rule the schedule repeats by.
    pub fn rule(&self) -> RecurrenceRule {
        self.rule
    }

    /// The date the schedule is next due to generate a transaction, or `None`
    /// once the schedule is exhausted.
    pub fn next_due(&self) -> Option<Date> {
        self.next_due
    }

    /// How many transactions the schedule has generated so far.
    pub fn occurrence_count(&self) -> i64 {
        self.occurrence_count
    }
}

#[cfg(test)]
mod next_occurrence_tests {
    use time::macros::date;

    use super::Frequency;

    #[test]
    fn daily_advances_one_day() {
        assert_eq!(
            Frequency::Daily.next_occurrence(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 01)
        );
    }

    #[test]
    fn weekly_advances_seven_days() {
        assert_eq!(
            Frequency::Weekly.next_occurrence(date!(2024 - 02 - 26)),
            date!(2024 - 03 - 04)
        );
    }

    #[test]
    fn biweekly_advances_fourteen_days() {
        assert_eq!(
            Frequency::Biweekly.next_occurrence(date!(2024 - 01 - 01)),
            date!(2024 - 01 - 15)
        );
    }

    #[test]
    fn monthly_preserves_day_of_month() {
        let frequency = Frequency::Monthly { anchor_day: None };

        assert_eq!(
            frequency.next_occurrence(date!(2024 - 01 - 15)),
            date!(2024 - 02 - 15)
        );
    }

    #[test]
    fn monthly_clamps_to_short_month() {
        let frequency = Frequency::Monthly { anchor_day: None };

        assert_eq!(
            frequency.next_occurrence(date!(2024 - 01 - 31)),
            date!(2024 - 02 - 29),
            "should clamp to leap day in a leap year"
        );
        assert_eq!(
            frequency.next_occurrence(date!(2023 - 01 - 31)),
            date!(2023 - 02 - 28),
            "should clamp to the 28th in a non-leap year"
        );
    }

    #[test]
    fn monthly_anchor_day_restores_after_clamp() {
        let frequency = Frequency::Monthly {
            anchor_day: Some(31),
        };

        assert_eq!(
            frequency.next_occurrence(date!(2024 - 02 - 29)),
            date!(2024 - 03 - 31)
        );
    }

    #[test]
    fn monthly_without_anchor_drifts_after_clamp() {
        let frequency = Frequency::Monthly { anchor_day: None };

        assert_eq!(
            frequency.next_occurrence(date!(2024 - 02 - 29)),
            date!(2024 - 03 - 29),
            "without an anchor the clamped day carries forward"
        );
    }

    #[test]
    fn monthly_rolls_over_year_end() {
        let frequency = Frequency::Monthly { anchor_day: None };

        assert_eq!(
            frequency.next_occurrence(date!(2024 - 12 - 15)),
            date!(2025 - 01 - 15)
        );
    }

    #[test]
    fn yearly_preserves_month_and_day() {
        assert_eq!(
            Frequency::Yearly.next_occurrence(date!(2024 - 03 - 17)),
            date!(2025 - 03 - 17)
        );
    }

    #[test]
    fn yearly_moves_leap_day_to_march_first() {
        assert_eq!(
            Frequency::Yearly.next_occurrence(date!(2024 - 02 - 29)),
            date!(2025 - 03 - 01)
        );
    }

    #[test]
    fn with_anchor_from_fills_monthly_anchor() {
        let frequency = Frequency::Monthly { anchor_day: None };

        assert_eq!(
            frequency.with_anchor_from(date!(2024 - 01 - 31)),
            Frequency::Monthly {
                anchor_day: Some(31)
            }
        );
    }

    #[test]
    fn with_anchor_from_keeps_existing_anchor() {
        let frequency = Frequency::Monthly {
            anchor_day: Some(15),
        };

        assert_eq!(
            frequency.with_anchor_from(date!(2024 - 01 - 31)),
            frequency
        );
    }
}
