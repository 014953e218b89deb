pub mod advance;
pub mod attendance;
pub mod expense;
pub mod salary;
pub mod worker;

pub use advance::{Advance, SHORTFALL_REASON_PREFIX};
pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use expense::Expense;
pub use salary::{SalaryCycle, SalaryPayment, SalaryStatus};
pub use worker::Worker;
