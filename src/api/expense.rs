use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::Engine;
use crate::error::EngineError;
use crate::salary::engine::AddExpense;
use crate::store::{ExpensePatch, RecordFilter};

#[derive(Deserialize, ToSchema)]
pub struct CreateExpense {
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

#[derive(Deserialize, ToSchema)]
pub struct UpdateExpense {
    #[schema(example = "2024-01-19", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,

    #[schema(example = 150.0)]
    pub amount: Option<f64>,

    #[schema(example = 3)]
    pub type_id: Option<u64>,

    #[schema(example = "cement bags", nullable = true)]
    pub note: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpense,
    responses(
        (status = 201, description = "Expense recorded", body = crate::model::Expense),
        (status = 400, description = "Non-positive amount or future date"),
        (status = 404, description = "Worker not found"),
        (status = 409, description = "Date inside a settled cycle")
    ),
    tag = "Expense"
)]
pub async fn create_expense(
    engine: web::Data<Engine>,
    payload: web::Json<CreateExpense>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let expense = engine
        .add_expense(AddExpense {
            worker_id: payload.worker_id,
            date: payload.date,
            amount: payload.amount,
            type_id: payload.type_id,
            note: payload.note,
        })
        .await?;
    Ok(HttpResponse::Created().json(expense))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    request_body = UpdateExpense,
    params(("id", description = "Expense ID")),
    responses(
        (status = 200, body = crate::model::Expense),
        (status = 404, description = "Expense not found"),
        (status = 409, description = "Expense is inside a settled cycle")
    ),
    tag = "Expense"
)]
pub async fn update_expense(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<UpdateExpense>,
) -> Result<impl Responder, EngineError> {
    let body = body.into_inner();
    let expense = engine
        .update_expense(
            path.into_inner(),
            ExpensePatch {
                date: body.date,
                amount: body.amount,
                type_id: body.type_id,
                note: body.note.map(Some),
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    params(("id", description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted"),
        (status = 404, description = "Expense not found"),
        (status = 409, description = "Expense is inside a settled cycle")
    ),
    tag = "Expense"
)]
pub async fn delete_expense(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    engine.delete_expense(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Expense deleted successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(RecordFilter),
    responses(
        (status = 200, description = "Matching expenses", body = [crate::model::Expense])
    ),
    tag = "Expense"
)]
pub async fn list_expenses(
    engine: web::Data<Engine>,
    query: web::Query<RecordFilter>,
) -> Result<impl Responder, EngineError> {
    let expenses = engine.list_expenses(&query).await?;
    Ok(HttpResponse::Ok().json(expenses))
}
