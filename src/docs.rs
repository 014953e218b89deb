use crate::api::advance::{CreateAdvance, UpdateAdvance};
use crate::api::attendance::{CreateAttendance, UpdateAttendance};
use crate::api::expense::{CreateExpense, UpdateExpense};
use crate::api::salary::{BreakdownQuery, CreateSalary, IssuePayment, LockQuery, PayWorker};
use crate::api::worker::{CreateWorker, UpdateWorker};
use crate::model::{
    Advance, AttendanceRecord, AttendanceStatus, Expense, SalaryCycle, SalaryPayment,
    SalaryStatus, Worker,
};
use crate::salary::{Breakdown, PaidPeriod, PaymentSummary};
use crate::store::RecordFilter;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wagebook API",
        version = "1.0.0",
        description = r#"
## Wagebook

Daily-wage worker tracking: attendance, cash advances, reimbursable
expenses, and periodic salary settlement.

### Key Features
- **Worker Registry**
  - Register and update workers, daily wage and overtime rates
- **Attendance**
  - Day-granular marking with wage/OT rates frozen per record
- **Advances & Expenses**
  - Deducted from gross pay at settlement
- **Salary Settlement**
  - Contiguous pay cycles, partial payments, carry-forward balances,
    automatic shortfall advances, and locking of settled history

### Response Format
JSON-based RESTful responses.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::worker::create_worker,
        crate::api::worker::list_workers,
        crate::api::worker::get_worker,
        crate::api::worker::update_worker,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::list_attendance,

        crate::api::advance::create_advance,
        crate::api::advance::update_advance,
        crate::api::advance::delete_advance,
        crate::api::advance::list_advances,

        crate::api::expense::create_expense,
        crate::api::expense::update_expense,
        crate::api::expense::delete_expense,
        crate::api::expense::list_expenses,

        crate::api::salary::get_breakdown,
        crate::api::salary::create_salary,
        crate::api::salary::get_salary,
        crate::api::salary::list_salaries,
        crate::api::salary::issue_salary,
        crate::api::salary::list_payments,
        crate::api::salary::pay_worker,
        crate::api::salary::paid_periods,
        crate::api::salary::is_locked
    ),
    components(
        schemas(
            Worker,
            AttendanceRecord,
            AttendanceStatus,
            Advance,
            Expense,
            SalaryCycle,
            SalaryPayment,
            SalaryStatus,
            Breakdown,
            PaidPeriod,
            PaymentSummary,
            RecordFilter,
            CreateWorker,
            UpdateWorker,
            CreateAttendance,
            UpdateAttendance,
            CreateAdvance,
            UpdateAdvance,
            CreateExpense,
            UpdateExpense,
            BreakdownQuery,
            CreateSalary,
            IssuePayment,
            PayWorker,
            LockQuery
        )
    ),
    tags(
        (name = "Worker", description = "Worker registry APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Advance", description = "Cash advance APIs"),
        (name = "Expense", description = "Reimbursable expense APIs"),
        (name = "Salary", description = "Salary settlement APIs"),
    )
)]
pub struct ApiDoc;
