use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SalaryStatus {
    Pending,
    Partial,
    Paid,
}

impl SalaryStatus {
    /// A cycle that has received at least one payment freezes the records
    /// inside its window.
    pub fn locks_records(self) -> bool {
        matches!(self, SalaryStatus::Partial | SalaryStatus::Paid)
    }

    /// Still owed money (counts toward the carry-forward balance).
    pub fn is_outstanding(self) -> bool {
        matches!(self, SalaryStatus::Pending | SalaryStatus::Partial)
    }
}

/// One settled (or settling) pay window for a worker.
///
/// Windows are inclusive on both ends and contiguous per worker: the next
/// cycle always starts the day after `cycle_end`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryCycle {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub cycle_start: NaiveDate,

    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub cycle_end: NaiveDate,

    #[schema(example = 12000.0)]
    pub base_pay: f64,

    #[schema(example = 600.0)]
    pub ot_pay: f64,

    #[schema(example = 12600.0)]
    pub gross_pay: f64,

    #[schema(example = 2000.0)]
    pub total_advance: f64,

    #[schema(example = 350.0)]
    pub total_expense: f64,

    /// Carry-forward owed across earlier cycles, snapshotted at creation
    #[schema(example = 0.0)]
    pub unpaid_balance: f64,

    /// Clamped to zero at creation; a negative computed net becomes a
    /// shortfall advance instead.
    #[schema(example = 10250.0)]
    pub net_pay: f64,

    #[schema(example = 0.0)]
    pub total_paid: f64,

    #[schema(example = "pending")]
    pub status: SalaryStatus,

    #[schema(example = json!(null), value_type = Option<String>, format = "date-time", nullable = true)]
    pub issued_at: Option<DateTime<Utc>>,

    #[schema(example = json!(null), nullable = true)]
    pub payment_proof: Option<String>,

    #[schema(example = json!(null), nullable = true)]
    pub signature: Option<String>,
}

impl SalaryCycle {
    pub fn remaining(&self) -> f64 {
        self.net_pay - self.total_paid
    }

    /// Closed-interval membership, used for attendance/expense locking.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.cycle_start <= date && date <= self.cycle_end
    }
}

/// Append-only payment ledger entry; the amounts for a cycle always sum to
/// its `total_paid`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryPayment {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub salary_id: u64,

    #[schema(example = 5000.0)]
    pub amount: f64,

    #[schema(example = "2024-02-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "bkash TXN123", nullable = true)]
    pub proof: Option<String>,

    /// Generated receipt reference
    #[schema(example = "7f8d3a1e-0b52-4c1f-9a44-1df1c0a2b9d0")]
    pub reference: String,
}
