//! MySQL implementation of the store traits.
//!
//! Queries use the runtime API (`sqlx::query_as` + binds) so the crate
//! builds without a live database. The query helpers are generic over the
//! executor, letting the pooled store and the transaction share them.

use chrono::NaiveDate;
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::{Executor, Transaction};

use crate::error::EngineError;
use crate::model::{
    Advance, AttendanceRecord, Expense, SHORTFALL_REASON_PREFIX, SalaryCycle, SalaryPayment,
    Worker,
};
use crate::store::{
    AdvancePatch, AttendancePatch, ExpensePatch, LedgerReader, NewAdvance, NewAttendance,
    NewExpense, NewPayment, NewSalaryCycle, NewWorker, PaymentUpdate, RecordFilter,
    SettlementStore, SettlementTx, WorkerPatch,
};

const WORKER_COLS: &str = "id, name, phone, wage, ot_rate, joined_at, opening_balance, balance, is_active";
const ATTENDANCE_COLS: &str = "id, worker_id, date, status, ot_units, wage_at_time, ot_rate_at_time";
const ADVANCE_COLS: &str = "id, worker_id, date, amount, reason, salary_id";
const EXPENSE_COLS: &str = "id, worker_id, date, amount, type_id, note";
const CYCLE_COLS: &str = "id, worker_id, cycle_start, cycle_end, base_pay, ot_pay, gross_pay, \
     total_advance, total_expense, unpaid_balance, net_pay, total_paid, status, issued_at, \
     payment_proof, signature";
const PAYMENT_COLS: &str = "id, salary_id, amount, date, proof, reference";

/// MySQL duplicate-key SQLSTATE (unique (worker_id, date) on attendance).
const DUP_KEY: &str = "23000";

fn map_dup(e: sqlx::Error, what: &str) -> EngineError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(DUP_KEY) {
            return EngineError::Conflict(format!("{what} already exists"));
        }
    }
    EngineError::Store(e)
}

/// WHERE clause + bind list for a [`RecordFilter`], appended in order.
fn filter_clause(filter: &RecordFilter) -> (String, Option<u64>, Option<NaiveDate>, Option<NaiveDate>) {
    let (from, to) = filter.date_bounds();
    let mut clause = String::from("WHERE 1 = 1");
    if filter.worker_id.is_some() {
        clause.push_str(" AND worker_id = ?");
    }
    if from.is_some() {
        clause.push_str(" AND date >= ?");
    }
    if to.is_some() {
        clause.push_str(" AND date <= ?");
    }
    (clause, filter.worker_id, from, to)
}

async fn fetch_filtered<'e, T, E>(
    ex: E,
    table: &str,
    cols: &str,
    filter: &RecordFilter,
) -> Result<Vec<T>, EngineError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> + Send + Unpin,
    E: Executor<'e, Database = MySql>,
{
    let (clause, worker_id, from, to) = filter_clause(filter);
    let sql = format!("SELECT {cols} FROM {table} {clause} ORDER BY date ASC, id ASC");
    let mut query = sqlx::query_as::<MySql, T>(&sql);
    if let Some(w) = worker_id {
        query = query.bind(w);
    }
    if let Some(f) = from {
        query = query.bind(f);
    }
    if let Some(t) = to {
        query = query.bind(t);
    }
    Ok(query.fetch_all(ex).await?)
}

async fn fetch_worker<'e, E>(ex: E, id: u64) -> Result<Option<Worker>, EngineError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {WORKER_COLS} FROM workers WHERE id = ?");
    Ok(sqlx::query_as::<MySql, Worker>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?)
}

async fn fetch_by_id<'e, T, E>(ex: E, table: &str, cols: &str, id: u64) -> Result<Option<T>, EngineError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> + Send + Unpin,
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {cols} FROM {table} WHERE id = ?");
    Ok(sqlx::query_as::<MySql, T>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?)
}

async fn fetch_shortfalls<'e, E>(
    ex: E,
    worker_id: u64,
    date: NaiveDate,
) -> Result<Vec<Advance>, EngineError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {ADVANCE_COLS} FROM advances \
         WHERE worker_id = ? AND date = ? AND reason LIKE ? ORDER BY id ASC"
    );
    Ok(sqlx::query_as::<MySql, Advance>(&sql)
        .bind(worker_id)
        .bind(date)
        .bind(format!("{SHORTFALL_REASON_PREFIX}%"))
        .fetch_all(ex)
        .await?)
}

async fn fetch_cycles<'e, E>(
    ex: E,
    worker_id: u64,
    only_outstanding: bool,
) -> Result<Vec<SalaryCycle>, EngineError>
where
    E: Executor<'e, Database = MySql>,
{
    let status_clause = if only_outstanding {
        " AND status IN ('pending', 'partial')"
    } else {
        ""
    };
    let sql = format!(
        "SELECT {CYCLE_COLS} FROM salary_cycles \
         WHERE worker_id = ?{status_clause} ORDER BY cycle_end ASC"
    );
    Ok(sqlx::query_as::<MySql, SalaryCycle>(&sql)
        .bind(worker_id)
        .fetch_all(ex)
        .await?)
}

async fn fetch_latest_cycle<'e, E>(
    ex: E,
    worker_id: u64,
    for_update: bool,
) -> Result<Option<SalaryCycle>, EngineError>
where
    E: Executor<'e, Database = MySql>,
{
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!(
        "SELECT {CYCLE_COLS} FROM salary_cycles \
         WHERE worker_id = ? ORDER BY cycle_end DESC LIMIT 1{suffix}"
    );
    Ok(sqlx::query_as::<MySql, SalaryCycle>(&sql)
        .bind(worker_id)
        .fetch_optional(ex)
        .await?)
}

/// Pooled store handed to the engine.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// One serialized settlement transaction.
pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

impl LedgerReader for MySqlStore {
    async fn worker(&mut self, id: u64) -> Result<Option<Worker>, EngineError> {
        fetch_worker(&self.pool, id).await
    }

    async fn workers(&mut self) -> Result<Vec<Worker>, EngineError> {
        let sql = format!("SELECT {WORKER_COLS} FROM workers ORDER BY id ASC");
        Ok(sqlx::query_as::<MySql, Worker>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn attendance(&mut self, id: u64) -> Result<Option<AttendanceRecord>, EngineError> {
        fetch_by_id(&self.pool, "attendance", ATTENDANCE_COLS, id).await
    }

    async fn attendance_in(
        &mut self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        fetch_filtered(&self.pool, "attendance", ATTENDANCE_COLS, filter).await
    }

    async fn advance(&mut self, id: u64) -> Result<Option<Advance>, EngineError> {
        fetch_by_id(&self.pool, "advances", ADVANCE_COLS, id).await
    }

    async fn advances_in(&mut self, filter: &RecordFilter) -> Result<Vec<Advance>, EngineError> {
        fetch_filtered(&self.pool, "advances", ADVANCE_COLS, filter).await
    }

    async fn shortfall_advances_on(
        &mut self,
        worker_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<Advance>, EngineError> {
        fetch_shortfalls(&self.pool, worker_id, date).await
    }

    async fn expense(&mut self, id: u64) -> Result<Option<Expense>, EngineError> {
        fetch_by_id(&self.pool, "expenses", EXPENSE_COLS, id).await
    }

    async fn expenses_in(&mut self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError> {
        fetch_filtered(&self.pool, "expenses", EXPENSE_COLS, filter).await
    }

    async fn cycle(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        fetch_by_id(&self.pool, "salary_cycles", CYCLE_COLS, id).await
    }

    async fn cycles(&mut self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError> {
        fetch_cycles(&self.pool, worker_id, false).await
    }

    async fn latest_cycle(&mut self, worker_id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        fetch_latest_cycle(&self.pool, worker_id, false).await
    }

    async fn outstanding_cycles(
        &mut self,
        worker_id: u64,
    ) -> Result<Vec<SalaryCycle>, EngineError> {
        fetch_cycles(&self.pool, worker_id, true).await
    }

    async fn payments_for(&mut self, salary_id: u64) -> Result<Vec<SalaryPayment>, EngineError> {
        let sql = format!(
            "SELECT {PAYMENT_COLS} FROM salary_payments WHERE salary_id = ? ORDER BY id ASC"
        );
        Ok(sqlx::query_as::<MySql, SalaryPayment>(&sql)
            .bind(salary_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

impl SettlementStore for MySqlStore {
    type Tx = MySqlTx;

    async fn begin(&self) -> Result<MySqlTx, EngineError> {
        Ok(MySqlTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn insert_worker(&mut self, worker: NewWorker) -> Result<Worker, EngineError> {
        let result = sqlx::query(
            "INSERT INTO workers \
             (name, phone, wage, ot_rate, joined_at, opening_balance, balance, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, 0, TRUE)",
        )
        .bind(&worker.name)
        .bind(&worker.phone)
        .bind(worker.wage)
        .bind(worker.ot_rate)
        .bind(worker.joined_at)
        .bind(worker.opening_balance)
        .execute(&self.pool)
        .await?;

        fetch_worker(&self.pool, result.last_insert_id())
            .await?
            .ok_or(EngineError::not_found("worker", result.last_insert_id()))
    }

    async fn update_worker(&mut self, id: u64, patch: WorkerPatch) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE workers SET \
             name = COALESCE(?, name), \
             phone = IF(? , ?, phone), \
             wage = COALESCE(?, wage), \
             ot_rate = COALESCE(?, ot_rate), \
             is_active = COALESCE(?, is_active) \
             WHERE id = ?",
        )
        .bind(&patch.name)
        .bind(patch.phone.is_some())
        .bind(patch.phone.clone().flatten())
        .bind(patch.wage)
        .bind(patch.ot_rate)
        .bind(patch.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_attendance(
        &mut self,
        record: NewAttendance,
    ) -> Result<AttendanceRecord, EngineError> {
        let result = sqlx::query(
            "INSERT INTO attendance \
             (worker_id, date, status, ot_units, wage_at_time, ot_rate_at_time) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.worker_id)
        .bind(record.date)
        .bind(record.status)
        .bind(record.ot_units)
        .bind(record.wage_at_time)
        .bind(record.ot_rate_at_time)
        .execute(&self.pool)
        .await
        .map_err(|e| map_dup(e, "attendance for this day"))?;

        fetch_by_id(&self.pool, "attendance", ATTENDANCE_COLS, result.last_insert_id())
            .await?
            .ok_or(EngineError::not_found("attendance", result.last_insert_id()))
    }

    async fn update_attendance(
        &mut self,
        id: u64,
        patch: AttendancePatch,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE attendance SET \
             status = COALESCE(?, status), \
             ot_units = COALESCE(?, ot_units) \
             WHERE id = ?",
        )
        .bind(patch.status)
        .bind(patch.ot_units)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_attendance(&mut self, id: u64) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError> {
        let result = sqlx::query(
            "INSERT INTO advances (worker_id, date, amount, reason, salary_id) \
             VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(advance.worker_id)
        .bind(advance.date)
        .bind(advance.amount)
        .bind(&advance.reason)
        .execute(&self.pool)
        .await?;

        fetch_by_id(&self.pool, "advances", ADVANCE_COLS, result.last_insert_id())
            .await?
            .ok_or(EngineError::not_found("advance", result.last_insert_id()))
    }

    async fn update_advance(&mut self, id: u64, patch: AdvancePatch) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE advances SET \
             date = COALESCE(?, date), \
             amount = COALESCE(?, amount), \
             reason = IF(?, ?, reason) \
             WHERE id = ?",
        )
        .bind(patch.date)
        .bind(patch.amount)
        .bind(patch.reason.is_some())
        .bind(patch.reason.clone().flatten())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_advance(&mut self, id: u64) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM advances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_expense(&mut self, expense: NewExpense) -> Result<Expense, EngineError> {
        let result = sqlx::query(
            "INSERT INTO expenses (worker_id, date, amount, type_id, note) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(expense.worker_id)
        .bind(expense.date)
        .bind(expense.amount)
        .bind(expense.type_id)
        .bind(&expense.note)
        .execute(&self.pool)
        .await?;

        fetch_by_id(&self.pool, "expenses", EXPENSE_COLS, result.last_insert_id())
            .await?
            .ok_or(EngineError::not_found("expense", result.last_insert_id()))
    }

    async fn update_expense(&mut self, id: u64, patch: ExpensePatch) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE expenses SET \
             date = COALESCE(?, date), \
             amount = COALESCE(?, amount), \
             type_id = COALESCE(?, type_id), \
             note = IF(?, ?, note) \
             WHERE id = ?",
        )
        .bind(patch.date)
        .bind(patch.amount)
        .bind(patch.type_id)
        .bind(patch.note.is_some())
        .bind(patch.note.clone().flatten())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_expense(&mut self, id: u64) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl LedgerReader for MySqlTx {
    async fn worker(&mut self, id: u64) -> Result<Option<Worker>, EngineError> {
        fetch_worker(&mut *self.tx, id).await
    }

    async fn workers(&mut self) -> Result<Vec<Worker>, EngineError> {
        let sql = format!("SELECT {WORKER_COLS} FROM workers ORDER BY id ASC");
        Ok(sqlx::query_as::<MySql, Worker>(&sql)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn attendance(&mut self, id: u64) -> Result<Option<AttendanceRecord>, EngineError> {
        fetch_by_id(&mut *self.tx, "attendance", ATTENDANCE_COLS, id).await
    }

    async fn attendance_in(
        &mut self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        fetch_filtered(&mut *self.tx, "attendance", ATTENDANCE_COLS, filter).await
    }

    async fn advance(&mut self, id: u64) -> Result<Option<Advance>, EngineError> {
        fetch_by_id(&mut *self.tx, "advances", ADVANCE_COLS, id).await
    }

    async fn advances_in(&mut self, filter: &RecordFilter) -> Result<Vec<Advance>, EngineError> {
        fetch_filtered(&mut *self.tx, "advances", ADVANCE_COLS, filter).await
    }

    async fn shortfall_advances_on(
        &mut self,
        worker_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<Advance>, EngineError> {
        fetch_shortfalls(&mut *self.tx, worker_id, date).await
    }

    async fn expense(&mut self, id: u64) -> Result<Option<Expense>, EngineError> {
        fetch_by_id(&mut *self.tx, "expenses", EXPENSE_COLS, id).await
    }

    async fn expenses_in(&mut self, filter: &RecordFilter) -> Result<Vec<Expense>, EngineError> {
        fetch_filtered(&mut *self.tx, "expenses", EXPENSE_COLS, filter).await
    }

    async fn cycle(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        fetch_by_id(&mut *self.tx, "salary_cycles", CYCLE_COLS, id).await
    }

    async fn cycles(&mut self, worker_id: u64) -> Result<Vec<SalaryCycle>, EngineError> {
        fetch_cycles(&mut *self.tx, worker_id, false).await
    }

    async fn latest_cycle(&mut self, worker_id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        fetch_latest_cycle(&mut *self.tx, worker_id, false).await
    }

    async fn outstanding_cycles(
        &mut self,
        worker_id: u64,
    ) -> Result<Vec<SalaryCycle>, EngineError> {
        fetch_cycles(&mut *self.tx, worker_id, true).await
    }

    async fn payments_for(&mut self, salary_id: u64) -> Result<Vec<SalaryPayment>, EngineError> {
        let sql = format!(
            "SELECT {PAYMENT_COLS} FROM salary_payments WHERE salary_id = ? ORDER BY id ASC"
        );
        Ok(sqlx::query_as::<MySql, SalaryPayment>(&sql)
            .bind(salary_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }
}

impl SettlementTx for MySqlTx {
    async fn cycle_for_update(&mut self, id: u64) -> Result<Option<SalaryCycle>, EngineError> {
        let sql = format!("SELECT {CYCLE_COLS} FROM salary_cycles WHERE id = ? FOR UPDATE");
        Ok(sqlx::query_as::<MySql, SalaryCycle>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn latest_cycle_for_update(
        &mut self,
        worker_id: u64,
    ) -> Result<Option<SalaryCycle>, EngineError> {
        fetch_latest_cycle(&mut *self.tx, worker_id, true).await
    }

    async fn insert_cycle(&mut self, cycle: NewSalaryCycle) -> Result<SalaryCycle, EngineError> {
        let result = sqlx::query(
            "INSERT INTO salary_cycles \
             (worker_id, cycle_start, cycle_end, base_pay, ot_pay, gross_pay, \
              total_advance, total_expense, unpaid_balance, net_pay, total_paid, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 'pending')",
        )
        .bind(cycle.worker_id)
        .bind(cycle.cycle_start)
        .bind(cycle.cycle_end)
        .bind(cycle.base_pay)
        .bind(cycle.ot_pay)
        .bind(cycle.gross_pay)
        .bind(cycle.total_advance)
        .bind(cycle.total_expense)
        .bind(cycle.unpaid_balance)
        .bind(cycle.net_pay)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        fetch_by_id(&mut *self.tx, "salary_cycles", CYCLE_COLS, id)
            .await?
            .ok_or(EngineError::not_found("salary cycle", id))
    }

    async fn insert_advance(&mut self, advance: NewAdvance) -> Result<Advance, EngineError> {
        let result = sqlx::query(
            "INSERT INTO advances (worker_id, date, amount, reason, salary_id) \
             VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(advance.worker_id)
        .bind(advance.date)
        .bind(advance.amount)
        .bind(&advance.reason)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        fetch_by_id(&mut *self.tx, "advances", ADVANCE_COLS, id)
            .await?
            .ok_or(EngineError::not_found("advance", id))
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<SalaryPayment, EngineError> {
        let result = sqlx::query(
            "INSERT INTO salary_payments (salary_id, amount, date, proof, reference) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(payment.salary_id)
        .bind(payment.amount)
        .bind(payment.date)
        .bind(&payment.proof)
        .bind(&payment.reference)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        fetch_by_id(&mut *self.tx, "salary_payments", PAYMENT_COLS, id)
            .await?
            .ok_or(EngineError::not_found("salary payment", id))
    }

    async fn apply_payment(
        &mut self,
        salary_id: u64,
        update: PaymentUpdate,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE salary_cycles SET \
             total_paid = ?, status = ?, issued_at = ?, \
             payment_proof = COALESCE(?, payment_proof), \
             signature = COALESCE(?, signature) \
             WHERE id = ?",
        )
        .bind(update.total_paid)
        .bind(update.status)
        .bind(update.issued_at)
        .bind(&update.proof)
        .bind(&update.signature)
        .bind(salary_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn consume_advances(
        &mut self,
        worker_id: u64,
        cycle_end: NaiveDate,
        salary_id: u64,
    ) -> Result<u64, EngineError> {
        let result = sqlx::query(
            "UPDATE advances SET salary_id = ? \
             WHERE worker_id = ? AND salary_id IS NULL AND date <= ?",
        )
        .bind(salary_id)
        .bind(worker_id)
        .bind(cycle_end)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn increment_worker_balance(
        &mut self,
        worker_id: u64,
        amount: f64,
    ) -> Result<(), EngineError> {
        sqlx::query("UPDATE workers SET balance = balance + ? WHERE id = ?")
            .bind(amount)
            .bind(worker_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), EngineError> {
        Ok(self.tx.commit().await?)
    }
}
