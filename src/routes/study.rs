use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::services::analytics;
use crate::services::ReviewError;
use crate::srs::{Grade, InvalidGrade};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(due_queue))
        .route("/review", post(submit_review))
        .route("/cram/global", get(global_cram))
        .route("/cram/:subject_id", get(subject_cram))
        .route("/analytics", get(study_analytics))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueQuery {
    subject_id: Option<String>,
}

async fn due_queue(
    auth: AuthUser,
    Query(q): Query<QueueQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let subject_id = q.subject_id.as_deref().filter(|s| !s.trim().is_empty());
    let cards = state.queues().due_queue(&auth.user_id, subject_id).await?;
    Ok(ok(cards))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    card_id: String,
    #[serde(default)]
    rating: Value,
    #[serde(default)]
    duration_ms: Option<u64>,
}

/// Accepts `"EASY"`/`"easy"`, `"4"` or `4`.
fn parse_rating(raw: &Value) -> Result<Grade, InvalidGrade> {
    match raw {
        Value::String(s) => s.parse(),
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .and_then(Grade::from_value)
            .ok_or_else(|| InvalidGrade(n.to_string())),
        other => Err(InvalidGrade(other.to_string())),
    }
}

async fn submit_review(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grade = parse_rating(&req.rating).map_err(ReviewError::from)?;
    let outcome = state
        .reviews()
        .submit_review(&auth.user_id, &req.card_id, grade, req.duration_ms.unwrap_or(0))
        .await?;
    Ok(ok(outcome))
}

async fn global_cram(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.queues().global_cram_queue(&auth.user_id)?))
}

async fn subject_cram(
    auth: AuthUser,
    Path(subject_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.queues().cram_queue(&auth.user_id, &subject_id)?))
}

async fn study_analytics(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(analytics::study_analytics(state.store(), &auth.user_id)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rating_accepts_names_and_numbers() {
        assert_eq!(parse_rating(&json!("easy")).unwrap(), Grade::Easy);
        assert_eq!(parse_rating(&json!("AGAIN")).unwrap(), Grade::Again);
        assert_eq!(parse_rating(&json!(3)).unwrap(), Grade::Good);
        assert_eq!(parse_rating(&json!("2")).unwrap(), Grade::Hard);
    }

    #[test]
    fn rating_rejects_everything_else() {
        for raw in [json!(0), json!(5), json!(-1), json!(2.5), json!("meh"), json!(null), json!([4])] {
            assert!(parse_rating(&raw).is_err(), "{raw} should be rejected");
        }
    }
}
