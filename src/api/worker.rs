use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::Engine;
use crate::error::EngineError;
use crate::store::{NewWorker, WorkerPatch};

#[derive(Deserialize, ToSchema)]
pub struct CreateWorker {
    #[schema(example = "Rahim Uddin")]
    pub name: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 500.0)]
    pub wage: f64,

    #[schema(example = 50.0)]
    pub ot_rate: f64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub joined_at: NaiveDate,

    #[schema(example = 0.0)]
    #[serde(default)]
    pub opening_balance: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateWorker {
    #[schema(example = "Rahim Uddin")]
    pub name: Option<String>,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 550.0)]
    pub wage: Option<f64>,

    #[schema(example = 55.0)]
    pub ot_rate: Option<f64>,

    #[schema(example = true)]
    pub is_active: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/v1/workers",
    request_body = CreateWorker,
    responses(
        (status = 201, description = "Worker registered", body = crate::model::Worker),
        (status = 400, description = "Invalid wage/rate or future join date")
    ),
    tag = "Worker"
)]
pub async fn create_worker(
    engine: web::Data<Engine>,
    payload: web::Json<CreateWorker>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let worker = engine
        .register_worker(NewWorker {
            name: payload.name,
            phone: payload.phone,
            wage: payload.wage,
            ot_rate: payload.ot_rate,
            joined_at: payload.joined_at,
            opening_balance: payload.opening_balance,
        })
        .await?;
    Ok(HttpResponse::Created().json(worker))
}

#[utoipa::path(
    get,
    path = "/api/v1/workers",
    responses(
        (status = 200, description = "All workers", body = [crate::model::Worker])
    ),
    tag = "Worker"
)]
pub async fn list_workers(engine: web::Data<Engine>) -> Result<impl Responder, EngineError> {
    let workers = engine.list_workers().await?;
    Ok(HttpResponse::Ok().json(workers))
}

#[utoipa::path(
    get,
    path = "/api/v1/workers/{id}",
    params(("id", description = "Worker ID")),
    responses(
        (status = 200, body = crate::model::Worker),
        (status = 404, description = "Worker not found")
    ),
    tag = "Worker"
)]
pub async fn get_worker(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let worker = engine.get_worker(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(worker))
}

#[utoipa::path(
    put,
    path = "/api/v1/workers/{id}",
    request_body = UpdateWorker,
    params(("id", description = "Worker ID")),
    responses(
        (status = 200, body = crate::model::Worker),
        (status = 404, description = "Worker not found")
    ),
    tag = "Worker"
)]
pub async fn update_worker(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<UpdateWorker>,
) -> Result<impl Responder, EngineError> {
    let body = body.into_inner();
    let worker = engine
        .update_worker(
            path.into_inner(),
            WorkerPatch {
                name: body.name,
                phone: body.phone.map(Some),
                wage: body.wage,
                ot_rate: body.ot_rate,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(worker))
}
