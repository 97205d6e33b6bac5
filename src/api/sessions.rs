use crate::api::handlers::error_response;
use crate::api::AppState;
use crate::error::SplitError;
use crate::models::NormalizedItem;
use crate::service::{export_summary_csv, NewSession, SplitSession};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use indexmap::IndexMap;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ReplaceItemsRequest {
    pub items: Vec<NormalizedItem>,
}

#[derive(Debug, Deserialize)]
pub struct AddPersonRequest {
    pub name: String,
}

/// 已选单位: 明细 id -> 单位数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub person_id: String,
    pub selections: IndexMap<String, u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub person_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub from_person_id: String,
    pub to_person_id: String,
    pub units: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignRequest {
    pub person_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipRequest {
    pub tip_percentage: f64,
}

/// 会话错误 -> HTTP 状态
pub fn split_error_response(err: SplitError) -> Response {
    let status = match &err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        SplitError::OverAllocation { .. } | SplitError::InsufficientUnits { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::warn!("Split request rejected: {}", err);
    error_response(status, err.to_string())
}

/// 修改会话后返回最新快照
fn mutate_and_snapshot<T>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&mut SplitSession) -> Result<T, SplitError>,
) -> Response {
    match state
        .sessions
        .update(id, |session| f(session).map(|_| session.snapshot()))
    {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => split_error_response(e),
    }
}

pub async fn create_session(State(state): State<AppState>, Json(req): Json<NewSession>) -> Response {
    match state.sessions.create(req) {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(e) => split_error_response(e),
    }
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.snapshot(id) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => split_error_response(e),
    }
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.remove(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => split_error_response(e),
    }
}

/// 重拍后替换明细
pub async fn replace_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplaceItemsRequest>,
) -> Response {
    mutate_and_snapshot(&state, id, |session| session.replace_items(&req.items))
}

pub async fn add_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddPersonRequest>,
) -> Response {
    match state.sessions.update(id, |session| session.add_person(&req.name)) {
        Ok(person) => (StatusCode::CREATED, Json(person)).into_response(),
        Err(e) => split_error_response(e),
    }
}

pub async fn assign_units(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Response {
    mutate_and_snapshot(&state, id, |session| {
        session.assign(&req.person_id, &req.selections)
    })
}

pub async fn clear_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, String)>,
    req: Option<Json<ClearRequest>>,
) -> Response {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    mutate_and_snapshot(&state, id, |session| {
        session.clear(&item_id, req.person_id.as_deref())
    })
}

pub async fn move_units(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, String)>,
    Json(req): Json<MoveRequest>,
) -> Response {
    mutate_and_snapshot(&state, id, |session| {
        session.move_units(&item_id, &req.from_person_id, &req.to_person_id, req.units)
    })
}

pub async fn reassign_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, String)>,
    Json(req): Json<ReassignRequest>,
) -> Response {
    mutate_and_snapshot(&state, id, |session| session.reassign(&item_id, &req.person_id))
}

pub async fn set_tip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TipRequest>,
) -> Response {
    mutate_and_snapshot(&state, id, |session| session.set_tip(req.tip_percentage))
}

pub async fn get_summary(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.read(id, |session| session.summary()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => split_error_response(e),
    }
}

/// CSV 导出
pub async fn export_summary(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let exported = state
        .sessions
        .read(id, |session| export_summary_csv(&session.summary(), &session.currency));

    match exported {
        Ok(Ok(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"split-{}.csv\"", id),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!("CSV export failed for session {}: {}", id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export summary")
        }
        Err(e) => split_error_response(e),
    }
}
