//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures become `{ error, kind }` JSON bodies.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = if self.is_not_found() {
      StatusCode::NOT_FOUND
    } else if self.is_client_error() {
      StatusCode::BAD_REQUEST
    } else {
      StatusCode::INTERNAL_SERVER_ERROR
    };
    if status.is_server_error() {
      error!(target: "hsk_mock", error = %self, kind = self.kind(), "Request failed");
    } else {
      warn!(target: "hsk_mock", error = %self, kind = self.kind(), "Request rejected");
    }
    (status, Json(ErrorOut { error: self.to_string(), kind: self.kind().to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, sessions: state.session_count().await })
}

#[instrument(level = "info", skip(state, body), fields(level = body.level, mode = ?body.mode))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = start_session(&state, body).await?;
  info!(target: "exam", session_id = %out.session_id, level = out.level, questions = out.question_count, "HTTP session started");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_next_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<NextOut>, ApiError> {
  Ok(Json(next_question(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, question_id = %body.question_id, answer_len = body.answer.len()))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  let out = submit_answer(&state, &id, &body.question_id, &body.answer).await?;
  info!(target: "exam", session_id = %id, question_id = %body.question_id, correct = out.correct, "HTTP answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id, question_id = %q.question_id))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Query(q): Query<HintQuery>,
) -> Result<Json<HintOut>, ApiError> {
  Ok(Json(get_hint(&state, &id, &q.question_id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_result(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(get_result(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_end_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  end_session(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}
