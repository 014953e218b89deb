//! Lock guard over settled history.
//!
//! Two deliberately distinct predicates: attendance/expense mutation treats
//! the paid window as a closed interval, while advance issuance treats the
//! upper bound as exclusive so an advance can still be issued on the
//! boundary day that opens the next cycle. The asymmetry is preserved from
//! the original product pending clarification; do not unify them.

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::model::SalaryCycle;

/// Cycle that locks `date` for attendance/expense/record edits:
/// `cycle_start <= date <= cycle_end` on a paid or partially paid cycle.
pub fn locking_cycle(cycles: &[SalaryCycle], date: NaiveDate) -> Option<&SalaryCycle> {
    cycles
        .iter()
        .filter(|c| c.status.locks_records())
        .find(|c| c.contains(date))
}

/// Cycle that locks `date` for issuing a new advance:
/// `cycle_start <= date < cycle_end` (upper bound exclusive).
pub fn locking_cycle_for_advance(cycles: &[SalaryCycle], date: NaiveDate) -> Option<&SalaryCycle> {
    cycles
        .iter()
        .filter(|c| c.status.locks_records())
        .find(|c| c.cycle_start <= date && date < c.cycle_end)
}

pub fn assert_record_unlocked(cycles: &[SalaryCycle], date: NaiveDate) -> Result<(), EngineError> {
    match locking_cycle(cycles, date) {
        Some(c) => Err(EngineError::RecordLocked {
            start: c.cycle_start,
            end: c.cycle_end,
        }),
        None => Ok(()),
    }
}

pub fn assert_advance_date_unlocked(
    cycles: &[SalaryCycle],
    date: NaiveDate,
) -> Result<(), EngineError> {
    match locking_cycle_for_advance(cycles, date) {
        Some(c) => Err(EngineError::RecordLocked {
            start: c.cycle_start,
            end: c.cycle_end,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SalaryStatus;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn cycle(start: &str, end: &str, status: SalaryStatus) -> SalaryCycle {
        SalaryCycle {
            id: 1,
            worker_id: 1,
            cycle_start: d(start),
            cycle_end: d(end),
            base_pay: 0.0,
            ot_pay: 0.0,
            gross_pay: 0.0,
            total_advance: 0.0,
            total_expense: 0.0,
            unpaid_balance: 0.0,
            net_pay: 0.0,
            total_paid: 0.0,
            status,
            issued_at: None,
            payment_proof: None,
            signature: None,
        }
    }

    #[test]
    fn paid_cycle_locks_dates_inside_its_window() {
        let cycles = [cycle("2024-01-01", "2024-01-31", SalaryStatus::Paid)];
        assert!(locking_cycle(&cycles, d("2024-01-15")).is_some());
        assert!(locking_cycle(&cycles, d("2024-02-01")).is_none());
        assert!(locking_cycle(&cycles, d("2023-12-31")).is_none());
    }

    #[test]
    fn pending_cycle_locks_nothing() {
        let cycles = [cycle("2024-01-01", "2024-01-31", SalaryStatus::Pending)];
        assert!(locking_cycle(&cycles, d("2024-01-15")).is_none());
    }

    #[test]
    fn partial_cycle_locks_like_paid() {
        let cycles = [cycle("2024-01-01", "2024-01-31", SalaryStatus::Partial)];
        assert!(locking_cycle(&cycles, d("2024-01-31")).is_some());
    }

    // The boundary asymmetry: the record predicate locks the cycle-end day,
    // the advance predicate leaves it open.
    #[test]
    fn advance_predicate_leaves_the_boundary_day_open() {
        let cycles = [cycle("2024-01-01", "2024-01-31", SalaryStatus::Paid)];
        assert!(locking_cycle(&cycles, d("2024-01-31")).is_some());
        assert!(locking_cycle_for_advance(&cycles, d("2024-01-31")).is_none());
        assert!(locking_cycle_for_advance(&cycles, d("2024-01-30")).is_some());
    }

    #[test]
    fn assert_names_the_offending_range() {
        let cycles = [cycle("2024-01-01", "2024-01-31", SalaryStatus::Paid)];
        let err = assert_record_unlocked(&cycles, d("2024-01-10")).unwrap_err();
        match err {
            EngineError::RecordLocked { start, end } => {
                assert_eq!(start, d("2024-01-01"));
                assert_eq!(end, d("2024-01-31"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
