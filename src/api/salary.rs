use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::api::Engine;
use crate::error::EngineError;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BreakdownQuery {
    /// Settlement date; defaults to today
    #[schema(example = "2024-01-31", value_type = Option<String>, format = "date")]
    pub pay_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSalary {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-31", value_type = Option<String>, format = "date")]
    pub pay_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct IssuePayment {
    #[schema(example = 5000.0)]
    pub amount: f64,

    #[schema(example = "bkash TXN123", nullable = true)]
    pub proof: Option<String>,

    #[schema(example = json!(null), nullable = true)]
    pub signature: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PayWorker {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = 250.0)]
    pub amount: f64,

    #[schema(example = json!(null), value_type = Option<String>, format = "date")]
    pub pay_date: Option<NaiveDate>,

    #[schema(example = "cash", nullable = true)]
    pub proof: Option<String>,

    #[schema(example = json!(null), nullable = true)]
    pub signature: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LockQuery {
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,
}

/// Preview the next settlement for a worker. Never mutates anything; a pay
/// date that precedes the unpaid window yields an all-zero breakdown.
#[utoipa::path(
    get,
    path = "/api/v1/salary/breakdown/{worker_id}",
    params(
        ("worker_id", description = "Worker ID"),
        BreakdownQuery
    ),
    responses(
        (status = 200, body = crate::salary::Breakdown),
        (status = 404, description = "Worker not found")
    ),
    tag = "Salary"
)]
pub async fn get_breakdown(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    query: web::Query<BreakdownQuery>,
) -> Result<impl Responder, EngineError> {
    let breakdown = engine
        .calculate_breakdown(path.into_inner(), query.pay_date)
        .await?;
    Ok(HttpResponse::Ok().json(breakdown))
}

/// Settle the worker's unpaid window into a new pending salary cycle.
#[utoipa::path(
    post,
    path = "/api/v1/salary",
    request_body = CreateSalary,
    responses(
        (status = 201, description = "Cycle created", body = crate::model::SalaryCycle),
        (status = 400, description = "Pay date precedes the unpaid window"),
        (status = 404, description = "Worker not found")
    ),
    tag = "Salary"
)]
pub async fn create_salary(
    engine: web::Data<Engine>,
    payload: web::Json<CreateSalary>,
) -> Result<impl Responder, EngineError> {
    let cycle = engine
        .create_salary(payload.worker_id, payload.pay_date)
        .await?;
    Ok(HttpResponse::Created().json(cycle))
}

#[utoipa::path(
    get,
    path = "/api/v1/salary/{id}",
    params(("id", description = "Salary cycle ID")),
    responses(
        (status = 200, body = crate::model::SalaryCycle),
        (status = 404, description = "Cycle not found")
    ),
    tag = "Salary"
)]
pub async fn get_salary(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let cycle = engine.get_cycle(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cycle))
}

#[utoipa::path(
    get,
    path = "/api/v1/salary/worker/{worker_id}",
    params(("worker_id", description = "Worker ID")),
    responses(
        (status = 200, description = "All cycles, oldest first", body = [crate::model::SalaryCycle]),
        (status = 404, description = "Worker not found")
    ),
    tag = "Salary"
)]
pub async fn list_salaries(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let cycles = engine.list_cycles(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cycles))
}

/// Pay against one cycle. Fails on already-paid cycles and on any amount
/// above the cycle's remaining balance.
#[utoipa::path(
    post,
    path = "/api/v1/salary/{id}/payments",
    request_body = IssuePayment,
    params(("id", description = "Salary cycle ID")),
    responses(
        (status = 200, description = "Payment recorded", body = crate::model::SalaryCycle),
        (status = 400, description = "Amount exceeds remaining balance"),
        (status = 404, description = "Cycle not found"),
        (status = 409, description = "Cycle already fully paid")
    ),
    tag = "Salary"
)]
pub async fn issue_salary(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<IssuePayment>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let cycle = engine
        .issue_salary(
            path.into_inner(),
            payload.amount,
            payload.proof,
            payload.signature,
        )
        .await?;
    Ok(HttpResponse::Ok().json(cycle))
}

#[utoipa::path(
    get,
    path = "/api/v1/salary/{id}/payments",
    params(("id", description = "Salary cycle ID")),
    responses(
        (status = 200, description = "Payment ledger for the cycle", body = [crate::model::SalaryPayment]),
        (status = 404, description = "Cycle not found")
    ),
    tag = "Salary"
)]
pub async fn list_payments(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let payments = engine.list_payments(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// Lump-sum payment: clears outstanding cycles oldest first, then settles
/// a fresh cycle with the remainder.
#[utoipa::path(
    post,
    path = "/api/v1/salary/pay",
    request_body = PayWorker,
    responses(
        (status = 200, description = "Allocation result", body = crate::salary::PaymentSummary),
        (status = 400, description = "Non-positive or excessive amount"),
        (status = 404, description = "Worker not found")
    ),
    tag = "Salary"
)]
pub async fn pay_worker(
    engine: web::Data<Engine>,
    payload: web::Json<PayWorker>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let summary = engine
        .pay_worker(
            payload.worker_id,
            payload.amount,
            payload.pay_date,
            payload.proof,
            payload.signature,
        )
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/salary/periods/{worker_id}",
    params(("worker_id", description = "Worker ID")),
    responses(
        (status = 200, description = "Paid/partial windows", body = [crate::salary::PaidPeriod]),
        (status = 404, description = "Worker not found")
    ),
    tag = "Salary"
)]
pub async fn paid_periods(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let periods = engine.paid_periods(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(periods))
}

#[utoipa::path(
    get,
    path = "/api/v1/salary/locked/{worker_id}",
    params(
        ("worker_id", description = "Worker ID"),
        LockQuery
    ),
    responses(
        (status = 200, description = "Whether the date is frozen by a settled cycle")
    ),
    tag = "Salary"
)]
pub async fn is_locked(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    query: web::Query<LockQuery>,
) -> Result<impl Responder, EngineError> {
    let locked = engine.is_locked(path.into_inner(), query.date).await?;
    Ok(HttpResponse::Ok().json(json!({ "locked": locked })))
}
