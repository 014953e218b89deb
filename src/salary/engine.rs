use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{
    Advance, AttendanceRecord, AttendanceStatus, Expense, SHORTFALL_REASON_PREFIX, SalaryCycle,
    SalaryPayment, SalaryStatus, Worker,
};
use crate::salary::breakdown::{self, Breakdown};
use crate::salary::lock;
use crate::salary::window::{self, CycleWindow};
use crate::store::{
    AdvancePatch, AttendancePatch, ExpensePatch, LedgerReader, NewAdvance, NewAttendance,
    NewExpense, NewPayment, NewSalaryCycle, NewWorker, PaymentUpdate, RecordFilter,
    SettlementStore, SettlementTx, WorkerPatch,
};

/// Attendance entry as the caller sees it; wage/OT rates are snapshotted
/// from the worker at creation, not taken from the caller.
#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub ot_units: f64,
}

#[derive(Debug, Clone)]
pub struct GiveAdvance {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub amount: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddExpense {
    pub worker_id: u64,
    pub date: NaiveDate,
    pub amount: f64,
    pub type_id: u64,
    pub note: Option<String>,
}

/// One row of `getPaidPeriods`: the windows the UI must treat as frozen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaidPeriod {
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub start: NaiveDate,

    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub end: NaiveDate,

    #[schema(example = "partial")]
    pub status: SalaryStatus,

    #[schema(example = 5000.0)]
    pub paid_amount: f64,

    #[schema(example = 5250.0)]
    pub remaining_amount: f64,
}

/// Result of a lump-sum `pay_worker` call: every cycle the money touched,
/// oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentSummary {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = 250.0)]
    pub amount: f64,

    pub cycles: Vec<SalaryCycle>,
}

/// The settlement engine. Stateless apart from the injected store handle;
/// every operation is a short read-then-write against it.
#[derive(Clone)]
pub struct SettlementEngine<S> {
    store: S,
}

impl<S: SettlementStore> SettlementEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn reader(&self) -> S {
        self.store.clone()
    }

    async fn require_worker<R: LedgerReader>(
        reader: &mut R,
        worker_id: u64,
    ) -> Result<Worker, EngineError> {
        reader
            .worker(worker_id)
            .await?
            .ok_or(EngineError::not_found("worker", worker_id))
    }

    async fn require_active_worker<R: LedgerReader>(
        reader: &mut R,
        worker_id: u64,
    ) -> Result<Worker, EngineError> {
        let worker = Self::require_worker(reader, worker_id).await?;
        if !worker.is_active {
            return Err(EngineError::InactiveWorker(worker_id));
        }
        Ok(worker)
    }

    /// All breakdown inputs for one window, read through `reader` so the
    /// same code runs inside and outside a transaction.
    async fn window_breakdown<R: LedgerReader>(
        reader: &mut R,
        worker: &Worker,
        last_cycle: Option<&SalaryCycle>,
        window: CycleWindow,
    ) -> Result<Breakdown, EngineError> {
        let filter = RecordFilter::worker(worker.id).between(window.start, window.end);
        let attendance = reader.attendance_in(&filter).await?;
        let advances = reader.advances_in(&filter).await?;
        let carried = match last_cycle {
            // a shortfall advance sits on the previous cycle's end day,
            // just outside this window; fold it in exactly once
            Some(last) => reader.shortfall_advances_on(worker.id, last.cycle_end).await?,
            None => Vec::new(),
        };
        let expenses = reader.expenses_in(&filter).await?;
        let outstanding = reader.outstanding_cycles(worker.id).await?;

        Ok(breakdown::assemble(
            worker,
            window,
            breakdown::gross_pay(&attendance),
            breakdown::advance_total(&advances, &carried),
            breakdown::expense_total(&expenses),
            breakdown::carry_forward(&outstanding),
            last_cycle.is_none(),
        ))
    }

    /// Preview of the next settlement. Never mutates; an inverted window
    /// (pay date before the unpaid window starts) yields an all-zero
    /// breakdown instead of an error.
    pub async fn calculate_breakdown(
        &self,
        worker_id: u64,
        pay_date: Option<NaiveDate>,
    ) -> Result<Breakdown, EngineError> {
        let mut store = self.reader();
        let worker = Self::require_worker(&mut store, worker_id).await?;
        let last = store.latest_cycle(worker_id).await?;
        let start = window::next_cycle_start(worker.joined_at, last.as_ref().map(|c| c.cycle_end))?;
        let end = pay_date.unwrap_or_else(window::today);
        if end < start {
            return Ok(Breakdown::empty(worker_id, start, end));
        }
        Self::window_breakdown(&mut store, &worker, last.as_ref(), CycleWindow { start, end })
            .await
    }

    /// Settle the worker's unpaid window into a new pending cycle. A
    /// negative net becomes a shortfall advance dated at the cycle end, and
    /// the cycle is stored with net zero. All writes happen in one
    /// transaction.
    pub async fn create_salary(
        &self,
        worker_id: u64,
        pay_date: Option<NaiveDate>,
    ) -> Result<SalaryCycle, EngineError> {
        let mut tx = self.store.begin().await?;
        let worker = Self::require_worker(&mut tx, worker_id).await?;
        let last = tx.latest_cycle_for_update(worker_id).await?;
        let win = window::resolve(
            worker.joined_at,
            last.as_ref().map(|c| c.cycle_end),
            pay_date,
        )?;
        let b = Self::window_breakdown(&mut tx, &worker, last.as_ref(), win).await?;

        let cycle = tx
            .insert_cycle(NewSalaryCycle {
                worker_id,
                cycle_start: b.cycle_start,
                cycle_end: b.cycle_end,
                base_pay: b.base_pay,
                ot_pay: b.ot_pay,
                gross_pay: b.gross_pay,
                total_advance: b.total_advance,
                total_expense: b.total_expense,
                unpaid_balance: b.unpaid_balance,
                net_pay: b.net_pay.max(0.0),
            })
            .await?;

        // consume before inserting any shortfall so the new shortfall stays
        // outstanding for the next cycle
        tx.consume_advances(worker_id, cycle.cycle_end, cycle.id).await?;

        if b.net_pay < 0.0 {
            let shortfall = -b.net_pay;
            tx.insert_advance(NewAdvance {
                worker_id,
                date: cycle.cycle_end,
                amount: shortfall,
                reason: Some(format!(
                    "{SHORTFALL_REASON_PREFIX} for {} - {}",
                    cycle.cycle_start, cycle.cycle_end
                )),
            })
            .await?;
            info!(
                worker_id,
                salary_id = cycle.id,
                shortfall,
                "net pay negative, recorded shortfall advance"
            );
        }

        tx.commit().await?;
        info!(
            worker_id,
            salary_id = cycle.id,
            net_pay = cycle.net_pay,
            "salary cycle created"
        );
        Ok(cycle)
    }

    /// Pay `amount` against one cycle. Serialized read-then-write: the
    /// cycle row is locked for the duration of the transaction so two
    /// concurrent payments cannot jointly overpay it.
    pub async fn issue_salary(
        &self,
        salary_id: u64,
        amount: f64,
        proof: Option<String>,
        signature: Option<String>,
    ) -> Result<SalaryCycle, EngineError> {
        if amount <= 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }

        let mut tx = self.store.begin().await?;
        let mut cycle = tx
            .cycle_for_update(salary_id)
            .await?
            .ok_or(EngineError::not_found("salary cycle", salary_id))?;

        if cycle.status == SalaryStatus::Paid {
            return Err(EngineError::AlreadySettled(salary_id));
        }
        let remaining = cycle.remaining();
        if amount > remaining {
            return Err(EngineError::AmountExceeded { amount, remaining });
        }

        let total_paid = cycle.total_paid + amount;
        let status = if total_paid >= cycle.net_pay {
            SalaryStatus::Paid
        } else {
            SalaryStatus::Partial
        };
        let issued_at = Utc::now();

        tx.apply_payment(
            salary_id,
            PaymentUpdate {
                total_paid,
                status,
                issued_at,
                proof: proof.clone(),
                signature: signature.clone(),
            },
        )
        .await?;
        tx.insert_payment(NewPayment {
            salary_id,
            amount,
            date: window::today(),
            proof: proof.clone(),
            reference: Uuid::new_v4().to_string(),
        })
        .await?;
        tx.increment_worker_balance(cycle.worker_id, amount).await?;
        tx.commit().await?;

        info!(
            salary_id,
            amount,
            total_paid,
            status = %status,
            "salary payment issued"
        );

        cycle.total_paid = total_paid;
        cycle.status = status;
        cycle.issued_at = Some(issued_at);
        if proof.is_some() {
            cycle.payment_proof = proof;
        }
        if signature.is_some() {
            cycle.signature = signature;
        }
        Ok(cycle)
    }

    /// Allocate a lump sum oldest-debt-first: clear outstanding cycles by
    /// ascending `cycle_end`, then settle a fresh cycle with whatever is
    /// left. Each payment is its own transaction; if the leftover exceeds
    /// the fresh cycle's net the final issue fails and the earlier valid
    /// payments stand.
    pub async fn pay_worker(
        &self,
        worker_id: u64,
        amount: f64,
        pay_date: Option<NaiveDate>,
        proof: Option<String>,
        signature: Option<String>,
    ) -> Result<PaymentSummary, EngineError> {
        if amount <= 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }
        let mut store = self.reader();
        Self::require_worker(&mut store, worker_id).await?;

        let outstanding = store.outstanding_cycles(worker_id).await?;
        let mut remaining = amount;
        let mut touched = Vec::new();

        for cycle in outstanding {
            if remaining <= 0.0 {
                break;
            }
            let due = cycle.remaining();
            if due <= 0.0 {
                continue;
            }
            let pay = if remaining < due { remaining } else { due };
            let updated = self
                .issue_salary(cycle.id, pay, proof.clone(), signature.clone())
                .await?;
            remaining -= pay;
            touched.push(updated);
        }

        if remaining > 0.0 {
            let fresh = self.create_salary(worker_id, pay_date).await?;
            let updated = self
                .issue_salary(fresh.id, remaining, proof, signature)
                .await?;
            touched.push(updated);
        }

        Ok(PaymentSummary {
            worker_id,
            amount,
            cycles: touched,
        })
    }

    /// Paid/partial windows with their balances; feeds UI locking.
    pub async fn paid_periods(&self, worker_id: u64) -> Result<Vec<PaidPeriod>, EngineError> {
        let mut store = self.reader();
        Self::require_worker(&mut store, worker_id).await?;
        let cycles = store.cycles(worker_id).await?;
        Ok(cycles
            .into_iter()
            .filter(|c| c.status.locks_records())
            .map(|c| PaidPeriod {
                start: c.cycle_start,
                end: c.cycle_end,
                status: c.status,
                paid_amount: c.total_paid,
                remaining_amount: c.remaining(),
            })
            .collect())
    }

    /// Does `date` fall inside an already (partially) paid cycle?
    pub async fn is_locked(&self, worker_id: u64, date: NaiveDate) -> Result<bool, EngineError> {
        let cycles = self.reader().cycles(worker_id).await?;
        Ok(lock::locking_cycle(&cycles, date).is_some())
    }

    async fn locked_check(
        &self,
        worker_id: u64,
        date: NaiveDate,
        for_advance: bool,
    ) -> Result<(), EngineError> {
        let cycles = self.reader().cycles(worker_id).await?;
        if for_advance {
            lock::assert_advance_date_unlocked(&cycles, date)
        } else {
            lock::assert_record_unlocked(&cycles, date)
        }
    }

    fn reject_future(date: NaiveDate) -> Result<(), EngineError> {
        if date > window::today() {
            return Err(EngineError::InvalidDate(format!("{date} is in the future")));
        }
        Ok(())
    }

    // ---- worker registry ----

    pub async fn register_worker(&self, new: NewWorker) -> Result<Worker, EngineError> {
        if new.wage < 0.0 {
            return Err(EngineError::InvalidAmount(new.wage));
        }
        if new.ot_rate < 0.0 {
            return Err(EngineError::InvalidAmount(new.ot_rate));
        }
        Self::reject_future(new.joined_at)?;
        self.reader().insert_worker(new).await
    }

    pub async fn update_worker(&self, id: u64, patch: WorkerPatch) -> Result<Worker, EngineError> {
        let mut store = self.reader();
        Self::require_worker(&mut store, id).await?;
        if patch.wage.is_some_and(|w| w < 0.0) {
            return Err(EngineError::InvalidAmount(patch.wage.unwrap_or_default()));
        }
        if patch.ot_rate.is_some_and(|r| r < 0.0) {
            return Err(EngineError::InvalidAmount(patch.ot_rate.unwrap_or_default()));
        }
        store.update_worker(id, patch).await?;
        Self::require_worker(&mut store, id).await
    }

    pub async fn get_worker(&self, id: u64) -> Result<Worker, EngineError> {
        Self::require_worker(&mut self.reader(), id).await
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>, EngineError> {
        self.reader().workers().await
    }

    // ---- attendance ----

    pub async fn mark_attendance(
        &self,
        cmd: MarkAttendance,
    ) -> Result<AttendanceRecord, EngineError> {
        let mut store = self.reader();
        let worker = Self::require_active_worker(&mut store, cmd.worker_id).await?;
        Self::reject_future(cmd.date)?;
        if cmd.ot_units < 0.0 {
            return Err(EngineError::InvalidAmount(cmd.ot_units));
        }
        self.locked_check(cmd.worker_id, cmd.date, false).await?;
        store
            .insert_attendance(NewAttendance {
                worker_id: cmd.worker_id,
                date: cmd.date,
                status: cmd.status,
                ot_units: cmd.ot_units,
                wage_at_time: worker.wage,
                ot_rate_at_time: worker.ot_rate,
            })
            .await
    }

    pub async fn update_attendance(
        &self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<AttendanceRecord, EngineError> {
        let mut store = self.reader();
        let record = store
            .attendance(id)
            .await?
            .ok_or(EngineError::not_found("attendance", id))?;
        Self::require_active_worker(&mut store, record.worker_id).await?;
        if patch.ot_units.is_some_and(|u| u < 0.0) {
            return Err(EngineError::InvalidAmount(patch.ot_units.unwrap_or_default()));
        }
        self.locked_check(record.worker_id, record.date, false).await?;
        store.update_attendance(id, patch).await?;
        store
            .attendance(id)
            .await?
            .ok_or(EngineError::not_found("attendance", id))
    }

    pub async fn delete_attendance(&self, id: u64) -> Result<(), EngineError> {
        let mut store = self.reader();
        let record = store
            .attendance(id)
            .await?
            .ok_or(EngineError::not_found("attendance", id))?;
        Self::require_active_worker(&mut store, record.worker_id).await?;
        self.locked_check(record.worker_id, record.date, false).await?;
        store.delete_attendance(id).await
    }

    pub async fn list_attendance(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        self.reader().attendance_in(filter).await
    }

    // ---- advances ----

    pub async fn give_advance(&self, cmd: GiveAdvance) -> Result<Advance, EngineError> {
        let mut store = self.reader();
        Self::require_active_worker(&mut store, cmd.worker_id).await?;
        if cmd.amount <= 0.0 {
            return Err(EngineError::InvalidAmount(cmd.amount));
        }
        Self::reject_future(cmd.date)?;
        // boundary-exclusive predicate: an advance on the day a new cycle
        // starts is allowed even though that day closes a paid window
        self.locked_check(cmd.worker_id, cmd.date, true).await?;
        store
            .insert_advance(NewAdvance {
                worker_id: cmd.worker_id,
                date: cmd.date,
                amount: cmd.amount,
                reason: cmd.reason,
            })
            .await
    }

    /// A consumed advance (salary_id set) is frozen; report the consuming
    /// cycle's window in the error.
    async fn require_unconsumed(
        store: &mut S,
        id: u64,
    ) -> Result<Advance, EngineError> {
        let advance = store
            .advance(id)
            .await?
            .ok_or(EngineError::not_found("advance", id))?;
        if let Some(salary_id) = advance.salary_id {
            if let Some(cycle) = store.cycle(salary_id).await? {
                return Err(EngineError::RecordLocked {
                    start: cycle.cycle_start,
                    end: cycle.cycle_end,
                });
            }
            return Err(EngineError::AlreadySettled(salary_id));
        }
        Ok(advance)
    }

    pub async fn update_advance(
        &self,
        id: u64,
        patch: AdvancePatch,
    ) -> Result<Advance, EngineError> {
        let mut store = self.reader();
        let advance = Self::require_unconsumed(&mut store, id).await?;
        Self::require_active_worker(&mut store, advance.worker_id).await?;
        if patch.amount.is_some_and(|a| a <= 0.0) {
            return Err(EngineError::InvalidAmount(patch.amount.unwrap_or_default()));
        }
        self.locked_check(advance.worker_id, advance.date, true).await?;
        if let Some(new_date) = patch.date {
            Self::reject_future(new_date)?;
            self.locked_check(advance.worker_id, new_date, true).await?;
        }
        store.update_advance(id, patch).await?;
        store
            .advance(id)
            .await?
            .ok_or(EngineError::not_found("advance", id))
    }

    pub async fn delete_advance(&self, id: u64) -> Result<(), EngineError> {
        let mut store = self.reader();
        let advance = Self::require_unconsumed(&mut store, id).await?;
        Self::require_active_worker(&mut store, advance.worker_id).await?;
        self.locked_check(advance.worker_id, advance.date, true).await?;
        store.delete_advance(id).await
    }

    pub async fn list_advances(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<Advance>, EngineError> {
        self.reader().advances_in(filter).await
    }

    // ---- expenses ----

    pub async fn add_expense(&self, cmd: AddExpense) -> Result<Expense, EngineError> {
        let mut store = self.reader();
        Self::require_active_worker(&mut store, cmd.worker_id).await?;
        if cmd.amount <= 0.0 {
            return Err(EngineError::InvalidAmount(cmd.amount));
        }
        Self::reject_future(cmd.date)?;
        self.locked_check(cmd.worker_id, cmd.date, false).await?;
        store
            .insert_expense(NewExpense {
                worker_id: cmd.worker_id,
                date: cmd.date,
                amount: cmd.amount,
                type_id: cmd.type_id,
                note: cmd.note,
            })
            .await
    }

    pub async fn update_expense(
        &self,
        id: u64,
        patch: ExpensePatch,
    ) -> Result<Expense, EngineError> {
        let mut store = self.reader();
        let expense = store
            .expense(id)
            .await?
            .ok_or(EngineError::not_found("expense", id))?;
        Self::require_active_worker(&mut store, expense.worker_id).await?;
        if patch.amount.is_some_and(|a| a <= 0.0) {
            return Err(EngineError::InvalidAmount(patch.amount.unwrap_or_default()));
        }
        self.locked_check(expense.worker_id, expense.date, false).await?;
        if let Some(new_date) = patch.date {
            Self::reject_future(new_date)?;
            self.locked_check(expense.worker_id, new_date, false).await?;
        }
        store.update_expense(id, patch).await?;
        store
            .expense(id)
            .await?
            .ok_or(EngineError::not_found("expense", id))
    }

    pub async fn delete_expense(&self, id: u64) -> Result<(), EngineError> {
        let mut store = self.reader();
        let expense = store
            .expense(id)
            .await?
            .ok_or(EngineError::not_found("expense", id))?;
        Self::require_active_worker(&mut store, expense.worker_id).await?;
        self.locked_check(expense.worker_id, expense.date, false).await?;
        store.delete_expense(id).await
    }

    pub async fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError> {
        self.reader().expenses_in(filter).await
    }

    // ---- cycles & payments ----

    pub async fn get_cycle(&self, salary_id: u64) -> Result<SalaryCycle, EngineError> {
        self.reader()
            .cycle(salary_id)
            .await?
            .ok_or(EngineError::not_found("salary cycle", salary_id))
    }

    pub async fn list_cycles(&self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError> {
        let mut store = self.reader();
        Self::require_worker(&mut store, worker_id).await?;
        store.cycles(worker_id).await
    }

    pub async fn list_payments(
        &self,
        salary_id: u64,
    ) -> Result<Vec<SalaryPayment>, EngineError> {
        let mut store = self.reader();
        store
            .cycle(salary_id)
            .await?
            .ok_or(EngineError::not_found("salary cycle", salary_id))?;
        store.payments_for(salary_id).await
    }
}
