use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A reimbursable expense paid by the worker on the company's behalf,
/// deducted from gross pay at settlement.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Expense {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-18", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = 120.0)]
    pub amount: f64,

    #[schema(example = 3)]
    pub type_id: u64,

    #[schema(example = "cement bags", nullable = true)]
    pub note: Option<String>,
}
