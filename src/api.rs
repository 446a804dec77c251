//! HTTP progress API: the thin backend the reader's HTTP store talks to.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::progress::{ProgressStore, ProgressUpdate, ReadingProgress, validate_id};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ProgressStore>,
}

pub fn router(store: Arc<dyn ProgressStore>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route(
            "/users/:user_id/progress",
            get(list_progress).post(save_progress),
        )
        .route(
            "/users/:user_id/progress/:grimoire_id",
            get(get_progress),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { store })
}

async fn list_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ReadingProgress>>, (StatusCode, String)> {
    validate_id(&user_id).map_err(bad_request)?;
    let records = state.store.list(&user_id).await.map_err(|err| {
        tracing::error!(user_id, ?err, "list progress failed");
        internal_error()
    })?;
    Ok(Json(records))
}

async fn get_progress(
    State(state): State<ApiState>,
    Path((user_id, grimoire_id)): Path<(String, String)>,
) -> Result<Json<ReadingProgress>, (StatusCode, String)> {
    validate_id(&user_id).map_err(bad_request)?;
    validate_id(&grimoire_id).map_err(bad_request)?;

    let record = state
        .store
        .load(&user_id, &grimoire_id)
        .await
        .map_err(|err| {
            tracing::error!(user_id, grimoire_id, ?err, "load progress failed");
            internal_error()
        })?;
    match record {
        Some(record) => Ok(Json(record)),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("no progress for grimoire {grimoire_id}"),
        )),
    }
}

async fn save_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(update): Json<ProgressUpdate>,
) -> Result<StatusCode, (StatusCode, String)> {
    validate_id(&user_id).map_err(bad_request)?;
    validate_id(&update.grimoire_id).map_err(bad_request)?;

    let mut progress = update.to_progress(&user_id);
    progress
        .validate()
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}")))?;

    // Completion is sticky: a grimoire once finished stays finished even if
    // the reader later jumps back to an earlier page.
    if let Ok(Some(existing)) = state.store.load(&user_id, &progress.grimoire_id).await
        && existing.completed
    {
        progress.completed = true;
    }

    state.store.save(&progress).await.map_err(|err| {
        tracing::error!(user_id, grimoire_id = %progress.grimoire_id, ?err, "save progress failed");
        internal_error()
    })?;
    Ok(StatusCode::NO_CONTENT)
}

fn bad_request(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("{err:#}"))
}

fn internal_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error".to_owned(),
    )
}
