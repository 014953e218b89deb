use chrono::NaiveDate;
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
pub enum AttendanceStatus {
    Present,
    Half,
    Absent,
}

impl AttendanceStatus {
    /// Fraction of the daily wage this status earns.
    pub fn day_fraction(self) -> f64 {
        match self {
            AttendanceStatus::Present => 1.0,
            AttendanceStatus::Half => 0.5,
            AttendanceStatus::Absent => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub worker_id: u64,

    /// Unique per worker
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "present")]
    pub status: AttendanceStatus,

    #[schema(example = 2.0)]
    pub ot_units: f64,

    /// Wage frozen at record creation; immutable so historical payroll
    /// stays reproducible after the worker's rate changes.
    #[schema(example = 500.0)]
    pub wage_at_time: f64,

    /// OT rate frozen at record creation; immutable like `wage_at_time`.
    #[schema(example = 50.0)]
    pub ot_rate_at_time: f64,
}
