//! The record-store seam the settlement engine is written against.
//!
//! The engine holds no mutable state of its own; everything lives in the
//! store. `LedgerReader` covers the queries, `SettlementTx` the serialized
//! read-then-write transactions used by cycle creation and payment issuance.
//! `mysql` is the production implementation, `memory` the all-or-nothing
//! fake the engine tests run against.

pub mod memory;
pub mod mysql;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::EngineError;
use crate::model::{
    Advance, AttendanceRecord, AttendanceStatus, Expense, SalaryCycle, SalaryPayment, SalaryStatus,
    Worker,
};

/// Statically typed record filter: worker, explicit date range, or a whole
/// month. Replaces ad-hoc stringly query maps.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct RecordFilter {
    #[schema(example = 1)]
    pub worker_id: Option<u64>,

    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,

    #[schema(example = "2024-01-31", value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,

    /// Any day of the wanted month; expands to that month's full range
    #[schema(example = json!(null), value_type = Option<String>, format = "date")]
    pub month: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn worker(worker_id: u64) -> Self {
        RecordFilter {
            worker_id: Some(worker_id),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Effective inclusive date bounds, with `month` expanded.
    pub fn date_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if let Some(day) = self.month {
            let first = day.with_day(1);
            let next_month = first.and_then(|f| f.checked_add_months(chrono::Months::new(1)));
            let last = next_month.and_then(|n| n.pred_opt());
            return (first, last);
        }
        (self.from, self.to)
    }

    pub fn matches(&self, worker_id: u64, date: NaiveDate) -> bool {
        if self.worker_id.is_some_and(|w| w != worker_id) {
            return false;
        }
        let (from, to) = self.date_bounds();
        if from.is_some_and(|f| date < f) {
            return false;
        }
        if to.is_some_and(|t| date > t) {
            return false;
        }
        true
    }
}

/// Insert payload for a worker.
#[derive(Debug, Clone)]
pub struct NewWorker {
    pub name: String,
    pub phone: Option<String>,
    pub wage: f64,
    pub ot_rate: f64,
    pub joined_at: NaiveDate,
    pub opening_balance: f64,
}

/// Partial update for a worker; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct WorkerPatch {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub wage: Option<f64>,
    pub ot_rate: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub ot_units: f64,
    pub wage_at_time: f64,
    pub ot_rate_at_time: f64,
}

/// Rate snapshots are deliberately absent: they are immutable once set.
#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
    pub status: Option<AttendanceStatus>,
    pub ot_units: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewAdvance {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub amount: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AdvancePatch {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub reason: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub amount: f64,
    pub type_id: u64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub type_id: Option<u64>,
    pub note: Option<Option<String>>,
}

/// Insert payload for a salary cycle, produced from a computed breakdown.
#[derive(Debug, Clone)]
pub struct NewSalaryCycle {
    pub worker_id: u64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub base_pay: f64,
    pub ot_pay: f64,
    pub gross_pay: f64,
    pub total_advance: f64,
    pub total_expense: f64,
    pub unpaid_balance: f64,
    pub net_pay: f64,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub salary_id: u64,
    pub amount: f64,
    pub date: NaiveDate,
    pub proof: Option<String>,
    pub reference: String,
}

/// Post-payment state of a cycle, written in the same transaction as the
/// payment row.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub total_paid: f64,
    pub status: SalaryStatus,
    pub issued_at: DateTime<Utc>,
    pub proof: Option<String>,
    pub signature: Option<String>,
}

/// Read side of the store. Implemented by both the pooled store and its
/// transactions so breakdown computation can run inside either.
pub trait LedgerReader {
    async fn worker(&mut self, id: u64) -> Result<Option<Worker>, EngineError>;
    async fn workers(&mut self) -> Result<Vec<Worker>, EngineError>;

    async fn attendance(&mut self, id: u64) -> Result<Option<AttendanceRecord>, EngineError>;
    async fn attendance_in(
        &mut self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError>;

    async fn advance(&mut self, id: u64) -> Result<Option<Advance>, EngineError>;
    async fn advances_in(&mut self, filter: &RecordFilter) -> Result<Vec<Advance>, EngineError>;
    /// Advances dated exactly `date` whose reason carries the shortfall
    /// marker; used to fold a boundary shortfall into the next cycle.
    async fn shortfall_advances_on(
        &mut self,
        worker_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<Advance>, EngineError>;

    async fn expense(&mut self, id: u64) -> Result<Option<Expense>, EngineError>;
    async fn expenses_in(&mut self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError>;

    async fn cycle(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError>;
    /// All cycles of a worker, `cycle_end` ascending.
    async fn cycles(&mut self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError>;
    async fn latest_cycle(&mut self, worker_id: u64) -> Result<Option<SalaryCycle>, EngineError>;
    /// Pending/partial cycles, `cycle_end` ascending (oldest debt first).
    async fn outstanding_cycles(
        &mut self,
        worker_id: u64,
    ) -> Result<Vec<SalaryCycle>, EngineError>;

    async fn payments_for(&mut self, salary_id: u64) -> Result<Vec<SalaryPayment>, EngineError>;
}

/// Transaction handle: reads see the transaction's own writes, and on the
/// MySQL side the `*_for_update` reads take row locks so two concurrent
/// payments cannot both observe a stale `total_paid`.
pub trait SettlementTx: LedgerReader {
    async fn cycle_for_update(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError>;
    async fn latest_cycle_for_update(
        &mut self,
        worker_id: u64,
    ) -> Result<Option<SalaryCycle>, EngineError>;

    async fn insert_cycle(&mut self, cycle: NewSalaryCycle) -> Result<SalaryCycle, EngineError>;
    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError>;
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<SalaryPayment, EngineError>;
    async fn apply_payment(
        &mut self,
        salary_id: u64,
        update: PaymentUpdate,
    ) -> Result<(), EngineError>;
    /// Stamp every still-unconsumed advance up to `cycle_end` with the
    /// settling cycle's id. Returns the number of advances consumed.
    async fn consume_advances(
        &mut self,
        worker_id: u64,
        cycle_end: NaiveDate,
        salary_id: u64,
    ) -> Result<u64, EngineError>;
    async fn increment_worker_balance(
        &mut self,
        worker_id: u64,
        amount: f64,
    ) -> Result<(), EngineError>;

    async fn commit(self) -> Result<(), EngineError>;
}

/// Full store collaborator injected into the engine.
pub trait SettlementStore: LedgerReader + Clone + 'static {
    type Tx: SettlementTx;

    async fn begin(&self) -> Result<Self::Tx, EngineError>;

    async fn insert_worker(&mut self, worker: NewWorker) -> Result<Worker, EngineError>;
    async fn update_worker(&mut self, id: u64, patch: WorkerPatch) -> Result<(), EngineError>;

    async fn insert_attendance(
        &mut self,
        record: NewAttendance,
    ) -> Result<AttendanceRecord, EngineError>;
    async fn update_attendance(
        &mut self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<(), EngineError>;
    async fn delete_attendance(&mut self, id: u64) -> Result<(), EngineError>;

    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError>;
    async fn update_advance(&mut self, id: u64, patch: AdvancePatch) -> Result<(), EngineError>;
    async fn delete_advance(&mut self, id: u64) -> Result<(), EngineError>;

    async fn insert_expense(&mut self, expense: NewExpense) -> Result<Expense, EngineError>;
    async fn update_expense(&mut self, id: u64, patch: ExpensePatch) -> Result<(), EngineError>;
    async fn delete_expense(&mut self, id: u64) -> Result<(), EngineError>;
}
