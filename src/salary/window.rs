use chrono::{Days, NaiveDate, Utc};

use crate::error::EngineError;

/// Inclusive date window of one settlement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Where the next cycle starts: the day after the last settled cycle, or
/// the join date if the worker has never been settled. Keeps cycles
/// contiguous and non-overlapping per worker.
pub fn next_cycle_start(
    joined_at: NaiveDate,
    last_cycle_end: Option<NaiveDate>,
) -> Result<NaiveDate, EngineError> {
    match last_cycle_end {
        Some(end) => end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| EngineError::InvalidDate("cycle start out of calendar range".into())),
        None => Ok(joined_at),
    }
}

/// Strict resolution: fails when the requested pay date falls before the
/// start of the unpaid window (e.g. a backdated pay date inside an already
/// settled cycle). Preview callers handle the inverted window themselves.
pub fn resolve(
    joined_at: NaiveDate,
    last_cycle_end: Option<NaiveDate>,
    pay_date: Option<NaiveDate>,
) -> Result<CycleWindow, EngineError> {
    let start = next_cycle_start(joined_at, last_cycle_end)?;
    let end = pay_date.unwrap_or_else(today);
    if end < start {
        return Err(EngineError::InvalidDate(format!(
            "cycle end {end} precedes cycle start {start}"
        )));
    }
    Ok(CycleWindow { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_cycle_starts_at_join_date() {
        let w = resolve(d("2024-01-01"), None, Some(d("2024-01-31"))).unwrap();
        assert_eq!(w.start, d("2024-01-01"));
        assert_eq!(w.end, d("2024-01-31"));
    }

    #[test]
    fn next_cycle_starts_the_day_after_the_last() {
        let w = resolve(d("2024-01-01"), Some(d("2024-01-31")), Some(d("2024-02-29"))).unwrap();
        assert_eq!(w.start, d("2024-02-01"));
        assert_eq!(w.end, d("2024-02-29"));
    }

    #[test]
    fn backdated_pay_date_inside_settled_history_fails() {
        let err = resolve(d("2024-01-01"), Some(d("2024-01-31")), Some(d("2024-01-15")))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDate(_)));
    }

    #[test]
    fn single_day_window_is_valid() {
        let w = resolve(d("2024-01-01"), Some(d("2024-01-31")), Some(d("2024-02-01"))).unwrap();
        assert_eq!(w.start, w.end);
    }
}
