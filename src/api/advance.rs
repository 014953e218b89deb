use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::Engine;
use crate::error::EngineError;
use crate::salary::engine::GiveAdvance;
use crate::store::{AdvancePatch, RecordFilter};

#[derive(Deserialize, ToSchema)]
pub struct CreateAdvance {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-20", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = 800.0)]
    pub amount: f64,

    #[schema(example = "festival advance", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAdvance {
    #[schema(example = "2024-01-21", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,

    #[schema(example = 600.0)]
    pub amount: Option<f64>,

    #[schema(example = "festival advance", nullable = true)]
    pub reason: Option<String>,
}

/// Issue a cash advance. The lock check here deliberately leaves the day a
/// paid cycle ends open, so an advance can be dated on the first day of
/// the next cycle.
#[utoipa::path(
    post,
    path = "/api/v1/advances",
    request_body = CreateAdvance,
    responses(
        (status = 201, description = "Advance issued", body = crate::model::Advance),
        (status = 400, description = "Non-positive amount or future date"),
        (status = 404, description = "Worker not found"),
        (status = 409, description = "Date inside a settled cycle")
    ),
    tag = "Advance"
)]
pub async fn create_advance(
    engine: web::Data<Engine>,
    payload: web::Json<CreateAdvance>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let advance = engine
        .give_advance(GiveAdvance {
            worker_id: payload.worker_id,
            date: payload.date,
            amount: payload.amount,
            reason: payload.reason,
        })
        .await?;
    Ok(HttpResponse::Created().json(advance))
}

#[utoipa::path(
    put,
    path = "/api/v1/advances/{id}",
    request_body = UpdateAdvance,
    params(("id", description = "Advance ID")),
    responses(
        (status = 200, body = crate::model::Advance),
        (status = 404, description = "Advance not found"),
        (status = 409, description = "Advance already consumed by a settled cycle")
    ),
    tag = "Advance"
)]
pub async fn update_advance(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<UpdateAdvance>,
) -> Result<impl Responder, EngineError> {
    let body = body.into_inner();
    let advance = engine
        .update_advance(
            path.into_inner(),
            AdvancePatch {
                date: body.date,
                amount: body.amount,
                reason: body.reason.map(Some),
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(advance))
}

#[utoipa::path(
    delete,
    path = "/api/v1/advances/{id}",
    params(("id", description = "Advance ID")),
    responses(
        (status = 200, description = "Advance deleted"),
        (status = 404, description = "Advance not found"),
        (status = 409, description = "Advance already consumed by a settled cycle")
    ),
    tag = "Advance"
)]
pub async fn delete_advance(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    engine.delete_advance(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Advance deleted successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/advances",
    params(RecordFilter),
    responses(
        (status = 200, description = "Matching advances", body = [crate::model::Advance])
    ),
    tag = "Advance"
)]
pub async fn list_advances(
    engine: web::Data<Engine>,
    query: web::Query<RecordFilter>,
) -> Result<impl Responder, EngineError> {
    let advances = engine.list_advances(&query).await?;
    Ok(HttpResponse::Ok().json(advances))
}
