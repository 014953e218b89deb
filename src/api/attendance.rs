use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::Engine;
use crate::error::EngineError;
use crate::model::AttendanceStatus;
use crate::salary::engine::MarkAttendance;
use crate::store::{AttendancePatch, RecordFilter};

#[derive(Deserialize, ToSchema)]
pub struct CreateAttendance {
    #[schema(example = 1)]
    pub worker_id: u64,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "present")]
    pub status: AttendanceStatus,

    #[schema(example = 2.0)]
    #[serde(default)]
    pub ot_units: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(example = "half")]
    pub status: Option<AttendanceStatus>,

    #[schema(example = 1.0)]
    pub ot_units: Option<f64>,
}

/// Mark a worker's attendance for a day; the worker's current wage and OT
/// rate are frozen onto the record.
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = CreateAttendance,
    responses(
        (status = 201, description = "Attendance marked", body = crate::model::AttendanceRecord),
        (status = 404, description = "Worker not found"),
        (status = 409, description = "Day already marked, or date inside a settled cycle")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    engine: web::Data<Engine>,
    payload: web::Json<CreateAttendance>,
) -> Result<impl Responder, EngineError> {
    let payload = payload.into_inner();
    let record = engine
        .mark_attendance(MarkAttendance {
            worker_id: payload.worker_id,
            date: payload.date,
            status: payload.status,
            ot_units: payload.ot_units,
        })
        .await?;
    Ok(HttpResponse::Created().json(record))
}

#[utoipa::path(
    put,
    path = "/api/v1/attendance/{id}",
    request_body = UpdateAttendance,
    params(("id", description = "Attendance record ID")),
    responses(
        (status = 200, body = crate::model::AttendanceRecord),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record is inside a settled cycle")
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: web::Json<UpdateAttendance>,
) -> Result<impl Responder, EngineError> {
    let body = body.into_inner();
    let record = engine
        .update_attendance(
            path.into_inner(),
            AttendancePatch {
                status: body.status,
                ot_units: body.ot_units,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{id}",
    params(("id", description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record is inside a settled cycle")
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    engine.delete_attendance(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance deleted successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(RecordFilter),
    responses(
        (status = 200, description = "Matching attendance records", body = [crate::model::AttendanceRecord])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    engine: web::Data<Engine>,
    query: web::Query<RecordFilter>,
) -> Result<impl Responder, EngineError> {
    let records = engine.list_attendance(&query).await?;
    Ok(HttpResponse::Ok().json(records))
}
