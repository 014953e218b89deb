use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reason prefix that marks a system-generated shortfall advance.
pub const SHORTFALL_REASON_PREFIX: &str = "Auto advance: salary shortfall";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Advance {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-20", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = 800.0)]
    pub amount: f64,

    #[schema(example = "festival advance", nullable = true)]
    pub reason: Option<String>,

    /// Set once the advance has been consumed by a settled cycle;
    /// while null the advance is still outstanding and editable.
    #[schema(example = json!(null), nullable = true)]
    pub salary_id: Option<u64>,
}

impl Advance {
    pub fn is_shortfall(&self) -> bool {
        self.reason
            .as_deref()
            .is_some_and(|r| r.starts_with(SHORTFALL_REASON_PREFIX))
    }

    pub fn is_consumed(&self) -> bool {
        self.salary_id.is_some()
    }
}
