use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Rahim Uddin",
        "phone": "+8801712345678",
        "wage": 500.0,
        "ot_rate": 50.0,
        "joined_at": "2024-01-01",
        "opening_balance": 0.0,
        "balance": 12500.0,
        "is_active": true
    })
)]
pub struct Worker {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Rahim Uddin")]
    pub name: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    /// Daily wage, in the ledger currency
    #[schema(example = 500.0)]
    pub wage: f64,

    /// Pay per overtime unit
    #[schema(example = 50.0)]
    pub ot_rate: f64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub joined_at: NaiveDate,

    /// Applied once, to the worker's very first salary cycle
    #[schema(example = 0.0)]
    pub opening_balance: f64,

    /// Running total of everything ever paid out to this worker
    #[schema(example = 12500.0)]
    pub balance: f64,

    #[schema(example = true)]
    pub is_active: bool,
}
