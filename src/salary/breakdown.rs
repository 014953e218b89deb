//! Pure settlement arithmetic: gross pay, deductions, carry-forward.
//!
//! Everything here operates on already-fetched record slices so it can be
//! tested without any store.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{Advance, AttendanceRecord, Expense, SalaryCycle, Worker};
use crate::salary::window::CycleWindow;

/// Computed settlement for one cycle window, before anything is persisted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Breakdown {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub cycle_start: NaiveDate,

    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub cycle_end: NaiveDate,

    #[schema(example = 24.5)]
    pub total_days: f64,

    #[schema(example = 12.0)]
    pub total_ot_units: f64,

    #[schema(example = 12250.0)]
    pub base_pay: f64,

    #[schema(example = 600.0)]
    pub ot_pay: f64,

    #[schema(example = 12850.0)]
    pub gross_pay: f64,

    #[schema(example = 2000.0)]
    pub total_advance: f64,

    #[schema(example = 350.0)]
    pub total_expense: f64,

    /// Carry-forward still owed across earlier pending/partial cycles
    #[schema(example = 0.0)]
    pub unpaid_balance: f64,

    /// Raw signed net for this window; negative means the worker owes the
    /// shortfall, which settlement turns into an auto advance.
    #[schema(example = 10500.0)]
    pub net_pay: f64,

    /// What a settlement today would actually owe the worker:
    /// `max(0, net_pay) + unpaid_balance`.
    #[schema(example = 10500.0)]
    pub total_net_payable: f64,
}

impl Breakdown {
    /// All-zero breakdown, returned by previews when the window is empty
    /// (pay date before the unpaid window starts).
    pub fn empty(worker_id: u64, cycle_start: NaiveDate, cycle_end: NaiveDate) -> Self {
        Breakdown {
            worker_id,
            cycle_start,
            cycle_end,
            total_days: 0.0,
            total_ot_units: 0.0,
            base_pay: 0.0,
            ot_pay: 0.0,
            gross_pay: 0.0,
            total_advance: 0.0,
            total_expense: 0.0,
            unpaid_balance: 0.0,
            net_pay: 0.0,
            total_net_payable: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrossPay {
    pub base_pay: f64,
    pub ot_pay: f64,
    pub total_days: f64,
    pub total_ot_units: f64,
}

/// Base pay from attendance status, overtime from every record regardless
/// of status (an absent worker's OT units still pay out; kept as-is from
/// the original product behavior, see the pinning test below). All money
/// comes from the rate snapshots frozen on each record, never from the
/// worker's current rates.
pub fn gross_pay(records: &[AttendanceRecord]) -> GrossPay {
    let mut gross = GrossPay::default();
    for record in records {
        let fraction = record.status.day_fraction();
        gross.base_pay += fraction * record.wage_at_time;
        gross.total_days += fraction;
        gross.ot_pay += record.ot_units * record.ot_rate_at_time;
        gross.total_ot_units += record.ot_units;
    }
    gross
}

/// Window advances plus any shortfall advance carried over from the
/// previous cycle's boundary day.
pub fn advance_total(advances: &[Advance], carried_shortfalls: &[Advance]) -> f64 {
    advances.iter().map(|a| a.amount).sum::<f64>()
        + carried_shortfalls.iter().map(|a| a.amount).sum::<f64>()
}

pub fn expense_total(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Total still owed across not-fully-paid cycles.
pub fn carry_forward(outstanding: &[SalaryCycle]) -> f64 {
    outstanding.iter().map(|c| c.remaining()).sum()
}

/// Assemble the full breakdown. `first_cycle` folds the worker's opening
/// balance into net pay exactly once, on the very first settlement.
pub fn assemble(
    worker: &Worker,
    window: CycleWindow,
    gross: GrossPay,
    total_advance: f64,
    total_expense: f64,
    unpaid_balance: f64,
    first_cycle: bool,
) -> Breakdown {
    let gross_pay = gross.base_pay + gross.ot_pay;
    let mut net_pay = gross_pay - total_advance - total_expense;
    if first_cycle {
        net_pay += worker.opening_balance;
    }
    Breakdown {
        worker_id: worker.id,
        cycle_start: window.start,
        cycle_end: window.end,
        total_days: gross.total_days,
        total_ot_units: gross.total_ot_units,
        base_pay: gross.base_pay,
        ot_pay: gross.ot_pay,
        gross_pay,
        total_advance,
        total_expense,
        unpaid_balance,
        net_pay,
        total_net_payable: net_pay.max(0.0) + unpaid_balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceStatus, SalaryStatus};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(status: AttendanceStatus, ot_units: f64) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            worker_id: 1,
            date: d("2024-01-15"),
            status,
            ot_units,
            wage_at_time: 500.0,
            ot_rate_at_time: 50.0,
        }
    }

    fn worker() -> Worker {
        Worker {
            id: 1,
            name: "test".into(),
            phone: None,
            wage: 500.0,
            ot_rate: 50.0,
            joined_at: d("2024-01-01"),
            opening_balance: 0.0,
            balance: 0.0,
            is_active: true,
        }
    }

    fn cycle(net_pay: f64, total_paid: f64, status: SalaryStatus) -> SalaryCycle {
        SalaryCycle {
            id: 1,
            worker_id: 1,
            cycle_start: d("2024-01-01"),
            cycle_end: d("2024-01-31"),
            base_pay: net_pay,
            ot_pay: 0.0,
            gross_pay: net_pay,
            total_advance: 0.0,
            total_expense: 0.0,
            unpaid_balance: 0.0,
            net_pay,
            total_paid,
            status,
            issued_at: None,
            payment_proof: None,
            signature: None,
        }
    }

    #[test]
    fn present_day_with_overtime() {
        let gross = gross_pay(&[record(AttendanceStatus::Present, 2.0)]);
        assert_eq!(gross.base_pay, 500.0);
        assert_eq!(gross.ot_pay, 100.0);
        assert_eq!(gross.total_days, 1.0);
        assert_eq!(gross.base_pay + gross.ot_pay, 600.0);
    }

    #[test]
    fn half_day_earns_half_wage() {
        let gross = gross_pay(&[record(AttendanceStatus::Half, 0.0)]);
        assert_eq!(gross.base_pay, 250.0);
        assert_eq!(gross.total_days, 0.5);
    }

    // Pins the current product behavior: OT units pay out even on an
    // absent day. Changing this requires a product decision.
    #[test]
    fn overtime_paid_even_when_absent() {
        let gross = gross_pay(&[record(AttendanceStatus::Absent, 3.0)]);
        assert_eq!(gross.base_pay, 0.0);
        assert_eq!(gross.total_days, 0.0);
        assert_eq!(gross.ot_pay, 150.0);
        assert_eq!(gross.total_ot_units, 3.0);
    }

    #[test]
    fn gross_uses_frozen_rates_not_current_ones() {
        let mut r = record(AttendanceStatus::Present, 1.0);
        r.wage_at_time = 400.0;
        r.ot_rate_at_time = 40.0;
        // worker's current rates are 500/50 and must not matter
        let gross = gross_pay(&[r]);
        assert_eq!(gross.base_pay, 400.0);
        assert_eq!(gross.ot_pay, 40.0);
    }

    #[test]
    fn carry_forward_sums_unpaid_remainders() {
        let cycles = [
            cycle(1000.0, 400.0, SalaryStatus::Partial),
            cycle(500.0, 0.0, SalaryStatus::Pending),
        ];
        assert_eq!(carry_forward(&cycles), 1100.0);
    }

    #[test]
    fn gross_equals_base_plus_ot() {
        let records = [
            record(AttendanceStatus::Present, 2.0),
            record(AttendanceStatus::Half, 1.5),
            record(AttendanceStatus::Absent, 0.5),
        ];
        let gross = gross_pay(&records);
        let window = CycleWindow {
            start: d("2024-01-01"),
            end: d("2024-01-31"),
        };
        let b = assemble(&worker(), window, gross, 0.0, 0.0, 0.0, true);
        assert_eq!(b.gross_pay, b.base_pay + b.ot_pay);
    }

    #[test]
    fn opening_balance_applied_only_on_first_cycle() {
        let mut w = worker();
        w.opening_balance = 300.0;
        let window = CycleWindow {
            start: d("2024-01-01"),
            end: d("2024-01-31"),
        };
        let gross = gross_pay(&[record(AttendanceStatus::Present, 0.0)]);

        let first = assemble(&w, window, gross, 0.0, 0.0, 0.0, true);
        assert_eq!(first.net_pay, 800.0);

        let later = assemble(&w, window, gross, 0.0, 0.0, 0.0, false);
        assert_eq!(later.net_pay, 500.0);
    }

    #[test]
    fn negative_net_stays_raw_but_payable_is_clamped() {
        let window = CycleWindow {
            start: d("2024-01-01"),
            end: d("2024-01-31"),
        };
        let gross = gross_pay(&[record(AttendanceStatus::Present, 2.0)]);
        let b = assemble(&worker(), window, gross, 800.0, 0.0, 250.0, false);
        assert_eq!(b.net_pay, -200.0);
        assert_eq!(b.total_net_payable, 250.0);
    }
}
