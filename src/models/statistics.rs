use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Reporting window for the dated aggregates (appointments, bills, revenue).
/// Patient and doctor totals are always cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsWindow {
    All,
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
    Range { from: NaiveDate, to: NaiveDate },
}

impl StatsWindow {
    /// Inclusive date bounds, or `None` for the unbounded window.
    pub fn bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>, DatabaseError> {
        let invalid = |reason: String| DatabaseError::validation("StatsWindow", reason);
        match *self {
            Self::All => Ok(None),
            Self::Day(d) => Ok(Some((d, d))),
            Self::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| invalid(format!("no such month {year}-{month:02}")))?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                };
                let last = next
                    .and_then(|n| n.pred_opt())
                    .ok_or_else(|| invalid(format!("no such month {year}-{month:02}")))?;
                Ok(Some((first, last)))
            }
            Self::Year(year) => {
                let first = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| invalid(format!("no such year {year}")))?;
                let last = NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| invalid(format!("no such year {year}")))?;
                Ok(Some((first, last)))
            }
            Self::Range { from, to } => {
                if from > to {
                    return Err(invalid(format!("range starts {from} after it ends {to}")));
                }
                Ok(Some((from, to)))
            }
        }
    }

    pub fn month_of(date: NaiveDate) -> Self {
        Self::Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Dashboard counters. Every field is zero when nothing matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_patients: i64,
    pub total_doctors: i64,
    pub total_appointments: i64,
    pub scheduled_appointments: i64,
    pub completed_appointments: i64,
    pub cancelled_appointments: i64,
    pub no_show_appointments: i64,
    pub total_bills: i64,
    pub pending_bills: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Patient,
    Appointment,
    Bill,
}

/// One line of the "recent activity" feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub id: String,
    pub name: Option<String>,
    pub action: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_bounds_cover_leap_february() {
        let (from, to) = StatsWindow::Month { year: 2024, month: 2 }.bounds().unwrap().unwrap();
        assert_eq!(from, d(2024, 2, 1));
        assert_eq!(to, d(2024, 2, 29));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (_, to) = StatsWindow::Month { year: 2025, month: 12 }.bounds().unwrap().unwrap();
        assert_eq!(to, d(2025, 12, 31));
    }

    #[test]
    fn invalid_month_rejected() {
        assert!(StatsWindow::Month { year: 2025, month: 13 }.bounds().is_err());
    }

    #[test]
    fn inverted_range_rejected() {
        let w = StatsWindow::Range { from: d(2025, 2, 1), to: d(2025, 1, 1) };
        assert!(w.bounds().is_err());
    }

    #[test]
    fn all_is_unbounded() {
        assert_eq!(StatsWindow::All.bounds().unwrap(), None);
    }
}
