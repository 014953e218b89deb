use actix_web::{HttpResponse, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;

/// Domain errors of the settlement engine. Everything except `Store` is a
/// caller mistake and maps to a 4xx response; store failures propagate as
/// 500 so the caller can retry.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("worker {0} is inactive")]
    InactiveWorker(u64),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("amount {amount} exceeds remaining balance {remaining}")]
    AmountExceeded { amount: f64, remaining: f64 },

    #[error("records from {start} to {end} belong to a settled salary cycle and are locked")]
    RecordLocked { start: NaiveDate, end: NaiveDate },

    #[error("salary cycle {0} is already fully paid")]
    AlreadySettled(u64),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        EngineError::NotFound { entity, id }
    }
}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::InvalidDate(_)
            | EngineError::InactiveWorker(_)
            | EngineError::InvalidAmount(_)
            | EngineError::AmountExceeded { .. } => StatusCode::BAD_REQUEST,
            EngineError::RecordLocked { .. }
            | EngineError::AlreadySettled(_)
            | EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let EngineError::Store(e) = self {
            tracing::error!(error = %e, "store failure");
            return HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            }));
        }
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
