//! In-memory store used by the engine's tests.
//!
//! `begin` snapshots the whole state; `commit` swaps the snapshot back in,
//! so an aborted transaction leaves nothing behind, matching the
//! all-or-nothing guarantee of the MySQL store. Single writer at a time;
//! good enough for tests, not a production store.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::model::{
    Advance, AttendanceRecord, Expense, SalaryCycle, SalaryPayment, SalaryStatus, Worker,
};
use crate::store::{
    AdvancePatch, AttendancePatch, ExpensePatch, LedgerReader, NewAdvance, NewAttendance,
    NewExpense, NewPayment, NewSalaryCycle, NewWorker, PaymentUpdate, RecordFilter,
    SettlementStore, SettlementTx, WorkerPatch,
};

#[derive(Debug, Clone, Default)]
struct MemState {
    next_id: u64,
    workers: Vec<Worker>,
    attendance: Vec<AttendanceRecord>,
    advances: Vec<Advance>,
    expenses: Vec<Expense>,
    cycles: Vec<SalaryCycle>,
    payments: Vec<SalaryPayment>,
}

impl MemState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn worker(&self, id: u64) -> Option<Worker> {
        self.workers.iter().find(|w| w.id == id).cloned()
    }

    fn attendance_in(&self, filter: &RecordFilter) -> Vec<AttendanceRecord> {
        let mut rows: Vec<_> = self
            .attendance
            .iter()
            .filter(|r| filter.matches(r.worker_id, r.date))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.date, r.id));
        rows
    }

    fn advances_in(&self, filter: &RecordFilter) -> Vec<Advance> {
        let mut rows: Vec<_> = self
            .advances
            .iter()
            .filter(|a| filter.matches(a.worker_id, a.date))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.date, a.id));
        rows
    }

    fn expenses_in(&self, filter: &RecordFilter) -> Vec<Expense> {
        let mut rows: Vec<_> = self
            .expenses
            .iter()
            .filter(|e| filter.matches(e.worker_id, e.date))
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.date, e.id));
        rows
    }

    fn cycles(&self, worker_id: u64, only_outstanding: bool) -> Vec<SalaryCycle> {
        let mut rows: Vec<_> = self
            .cycles
            .iter()
            .filter(|c| c.worker_id == worker_id)
            .filter(|c| !only_outstanding || c.status.is_outstanding())
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.cycle_end);
        rows
    }

    fn latest_cycle(&self, worker_id: u64) -> Option<SalaryCycle> {
        self.cycles(worker_id, false).into_iter().next_back()
    }

    fn insert_advance(&mut self, advance: NewAdvance) -> Advance {
        let row = Advance {
            id: self.next_id(),
            worker_id: advance.worker_id,
            date: advance.date,
            amount: advance.amount,
            reason: advance.reason,
            salary_id: None,
        };
        self.advances.push(row.clone());
        row
    }
}

/// Shared fake store; cloning yields a handle onto the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.inner.lock().expect("memory store poisoned")
    }
}

/// Snapshot transaction over [`MemoryStore`].
pub struct MemoryTx {
    shared: Arc<Mutex<MemState>>,
    work: MemState,
}

impl LedgerReader for MemoryStore {
    async fn worker(&mut self, id: u64) -> Result<Option<Worker>, EngineError> {
        Ok(self.state().worker(id))
    }

    async fn workers(&mut self) -> Result<Vec<Worker>, EngineError> {
        Ok(self.state().workers.clone())
    }

    async fn attendance(&mut self, id: u64) -> Result<Option<AttendanceRecord>, EngineError> {
        Ok(self.state().attendance.iter().find(|r| r.id == id).cloned())
    }

    async fn attendance_in(
        &mut self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        Ok(self.state().attendance_in(filter))
    }

    async fn advance(&mut self, id: u64) -> Result<Option<Advance>, EngineError> {
        Ok(self.state().advances.iter().find(|a| a.id == id).cloned())
    }

    async fn advances_in(&mut self, filter: &RecordFilter) -> Result<Vec<Advance>, EngineError> {
        Ok(self.state().advances_in(filter))
    }

    async fn shortfall_advances_on(
        &mut self,
        worker_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<Advance>, EngineError> {
        Ok(self
            .state()
            .advances
            .iter()
            .filter(|a| a.worker_id == worker_id && a.date == date && a.is_shortfall())
            .cloned()
            .collect())
    }

    async fn expense(&mut self, id: u64) -> Result<Option<Expense>, EngineError> {
        Ok(self.state().expenses.iter().find(|e| e.id == id).cloned())
    }

    async fn expenses_in(&mut self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError> {
        Ok(self.state().expenses_in(filter))
    }

    async fn cycle(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.state().cycles.iter().find(|c| c.id == id).cloned())
    }

    async fn cycles(&mut self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError> {
        Ok(self.state().cycles(worker_id, false))
    }

    async fn latest_cycle(&mut self, worker_id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.state().latest_cycle(worker_id))
    }

    async fn outstanding_cycles(
        &mut self,
        worker_id: u64,
    ) -> Result<Vec<SalaryCycle>, EngineError> {
        Ok(self.state().cycles(worker_id, true))
    }

    async fn payments_for(&mut self, salary_id: u64) -> Result<Vec<SalaryPayment>, EngineError> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.salary_id == salary_id)
            .cloned()
            .collect())
    }
}

impl SettlementStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, EngineError> {
        let work = self.state().clone();
        Ok(MemoryTx {
            shared: Arc::clone(&self.inner),
            work,
        })
    }

    async fn insert_worker(&mut self, worker: NewWorker) -> Result<Worker, EngineError> {
        let mut state = self.state();
        let row = Worker {
            id: state.next_id(),
            name: worker.name,
            phone: worker.phone,
            wage: worker.wage,
            ot_rate: worker.ot_rate,
            joined_at: worker.joined_at,
            opening_balance: worker.opening_balance,
            balance: 0.0,
            is_active: true,
        };
        state.workers.push(row.clone());
        Ok(row)
    }

    async fn update_worker(&mut self, id: u64, patch: WorkerPatch) -> Result<(), EngineError> {
        let mut state = self.state();
        let w = state
            .workers
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(EngineError::not_found("worker", id))?;
        if let Some(name) = patch.name {
            w.name = name;
        }
        if let Some(phone) = patch.phone {
            w.phone = phone;
        }
        if let Some(wage) = patch.wage {
            w.wage = wage;
        }
        if let Some(ot_rate) = patch.ot_rate {
            w.ot_rate = ot_rate;
        }
        if let Some(is_active) = patch.is_active {
            w.is_active = is_active;
        }
        Ok(())
    }

    async fn insert_attendance(
        &mut self,
        record: NewAttendance,
    ) -> Result<AttendanceRecord, EngineError> {
        let mut state = self.state();
        if state
            .attendance
            .iter()
            .any(|r| r.worker_id == record.worker_id && r.date == record.date)
        {
            return Err(EngineError::Conflict(
                "attendance for this day already exists".into(),
            ));
        }
        let row = AttendanceRecord {
            id: state.next_id(),
            worker_id: record.worker_id,
            date: record.date,
            status: record.status,
            ot_units: record.ot_units,
            wage_at_time: record.wage_at_time,
            ot_rate_at_time: record.ot_rate_at_time,
        };
        state.attendance.push(row.clone());
        Ok(row)
    }

    async fn update_attendance(
        &mut self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<(), EngineError> {
        let mut state = self.state();
        let r = state
            .attendance
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EngineError::not_found("attendance", id))?;
        if let Some(status) = patch.status {
            r.status = status;
        }
        if let Some(ot_units) = patch.ot_units {
            r.ot_units = ot_units;
        }
        Ok(())
    }

    async fn delete_attendance(&mut self, id: u64) -> Result<(), EngineError> {
        self.state().attendance.retain(|r| r.id != id);
        Ok(())
    }

    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError> {
        Ok(self.state().insert_advance(advance))
    }

    async fn update_advance(&mut self, id: u64, patch: AdvancePatch) -> Result<(), EngineError> {
        let mut state = self.state();
        let a = state
            .advances
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(EngineError::not_found("advance", id))?;
        if let Some(date) = patch.date {
            a.date = date;
        }
        if let Some(amount) = patch.amount {
            a.amount = amount;
        }
        if let Some(reason) = patch.reason {
            a.reason = reason;
        }
        Ok(())
    }

    async fn delete_advance(&mut self, id: u64) -> Result<(), EngineError> {
        self.state().advances.retain(|a| a.id != id);
        Ok(())
    }

    async fn insert_expense(&mut self, expense: NewExpense) -> Result<Expense, EngineError> {
        let mut state = self.state();
        let row = Expense {
            id: state.next_id(),
            worker_id: expense.worker_id,
            date: expense.date,
            amount: expense.amount,
            type_id: expense.type_id,
            note: expense.note,
        };
        state.expenses.push(row.clone());
        Ok(row)
    }

    async fn update_expense(&mut self, id: u64, patch: ExpensePatch) -> Result<(), EngineError> {
        let mut state = self.state();
        let e = state
            .expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(EngineError::not_found("expense", id))?;
        if let Some(date) = patch.date {
            e.date = date;
        }
        if let Some(amount) = patch.amount {
            e.amount = amount;
        }
        if let Some(type_id) = patch.type_id {
            e.type_id = type_id;
        }
        if let Some(note) = patch.note {
            e.note = note;
        }
        Ok(())
    }

    async fn delete_expense(&mut self, id: u64) -> Result<(), EngineError> {
        self.state().expenses.retain(|e| e.id != id);
        Ok(())
    }
}

impl LedgerReader for MemoryTx {
    async fn worker(&mut self, id: u64) -> Result<Option<Worker>, EngineError> {
        Ok(self.work.worker(id))
    }

    async fn workers(&mut self) -> Result<Vec<Worker>, EngineError> {
        Ok(self.work.workers.clone())
    }

    async fn attendance(&mut self, id: u64) -> Result<Option<AttendanceRecord>, EngineError> {
        Ok(self.work.attendance.iter().find(|r| r.id == id).cloned())
    }

    async fn attendance_in(
        &mut self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        Ok(self.work.attendance_in(filter))
    }

    async fn advance(&mut self, id: u64) -> Result<Option<Advance>, EngineError> {
        Ok(self.work.advances.iter().find(|a| a.id == id).cloned())
    }

    async fn advances_in(&mut self, filter: &RecordFilter) -> Result<Vec<Advance>, EngineError> {
        Ok(self.work.advances_in(filter))
    }

    async fn shortfall_advances_on(
        &mut self,
        worker_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<Advance>, EngineError> {
        Ok(self
            .work
            .advances
            .iter()
            .filter(|a| a.worker_id == worker_id && a.date == date && a.is_shortfall())
            .cloned()
            .collect())
    }

    async fn expense(&mut self, id: u64) -> Result<Option<Expense>, EngineError> {
        Ok(self.work.expenses.iter().find(|e| e.id == id).cloned())
    }

    async fn expenses_in(&mut self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError> {
        Ok(self.work.expenses_in(filter))
    }

    async fn cycle(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.work.cycles.iter().find(|c| c.id == id).cloned())
    }

    async fn cycles(&mut self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError> {
        Ok(self.work.cycles(worker_id, false))
    }

    async fn latest_cycle(&mut self, worker_id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.work.latest_cycle(worker_id))
    }

    async fn outstanding_cycles(
        &mut self,
        worker_id: u64,
    ) -> Result<Vec<SalaryCycle>, EngineError> {
        Ok(self.work.cycles(worker_id, true))
    }

    async fn payments_for(&mut self, salary_id: u64) -> Result<Vec<SalaryPayment>, EngineError> {
        Ok(self
            .work
            .payments
            .iter()
            .filter(|p| p.salary_id == salary_id)
            .cloned()
            .collect())
    }
}

impl SettlementTx for MemoryTx {
    async fn cycle_for_update(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.work.cycles.iter().find(|c| c.id == id).cloned())
    }

    async fn latest_cycle_for_update(
        &mut self,
        worker_id: u64,
    ) -> Result<Option<SalaryCycle>, EngineError> {
        Ok(self.work.latest_cycle(worker_id))
    }

    async fn insert_cycle(&mut self, cycle: NewSalaryCycle) -> Result<SalaryCycle, EngineError> {
        let row = SalaryCycle {
            id: self.work.next_id(),
            worker_id: cycle.worker_id,
            cycle_start: cycle.cycle_start,
            cycle_end: cycle.cycle_end,
            base_pay: cycle.base_pay,
            ot_pay: cycle.ot_pay,
            gross_pay: cycle.gross_pay,
            total_advance: cycle.total_advance,
            total_expense: cycle.total_expense,
            unpaid_balance: cycle.unpaid_balance,
            net_pay: cycle.net_pay,
            total_paid: 0.0,
            status: SalaryStatus::Pending,
            issued_at: None,
            payment_proof: None,
            signature: None,
        };
        self.work.cycles.push(row.clone());
        Ok(row)
    }

    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError> {
        Ok(self.work.insert_advance(advance))
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<SalaryPayment, EngineError> {
        let row = SalaryPayment {
            id: self.work.next_id(),
            salary_id: payment.salary_id,
            amount: payment.amount,
            date: payment.date,
            proof: payment.proof,
            reference: payment.reference,
        };
        self.work.payments.push(row.clone());
        Ok(row)
    }

    async fn apply_payment(
        &mut self,
        salary_id: u64,
        update: PaymentUpdate,
    ) -> Result<(), EngineError> {
        let cycle = self
            .work
            .cycles
            .iter_mut()
            .find(|c| c.id == salary_id)
            .ok_or(EngineError::not_found("salary cycle", salary_id))?;
        cycle.total_paid = update.total_paid;
        cycle.status = update.status;
        cycle.issued_at = Some(update.issued_at);
        if update.proof.is_some() {
            cycle.payment_proof = update.proof;
        }
        if update.signature.is_some() {
            cycle.signature = update.signature;
        }
        Ok(())
    }

    async fn consume_advances(
        &mut self,
        worker_id: u64,
        cycle_end: NaiveDate,
        salary_id: u64,
    ) -> Result<u64, EngineError> {
        let mut consumed = 0;
        for a in self
            .work
            .advances
            .iter_mut()
            .filter(|a| a.worker_id == worker_id && a.salary_id.is_none() && a.date <= cycle_end)
        {
            a.salary_id = Some(salary_id);
            consumed += 1;
        }
        Ok(consumed)
    }

    async fn increment_worker_balance(
        &mut self,
        worker_id: u64,
        amount: f64,
    ) -> Result<(), EngineError> {
        let worker = self
            .work
            .workers
            .iter_mut()
            .find(|w| w.id == worker_id)
            .ok_or(EngineError::not_found("worker", worker_id))?;
        worker.balance += amount;
        Ok(())
    }

    async fn commit(self) -> Result<(), EngineError> {
        *self.shared.lock().expect("memory store poisoned") = self.work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The fake must not swallow writes against rows that do not exist.
    #[actix_web::test]
    async fn updating_a_missing_row_is_not_found() {
        let mut store = MemoryStore::new();

        let err = store.update_worker(1, WorkerPatch::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = store
            .update_attendance(1, AttendancePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = store.update_advance(1, AdvancePatch::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = store.update_expense(1, ExpensePatch::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
