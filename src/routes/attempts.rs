use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AttemptDetail, ListAttemptsQuery, PaginatedAttempts, ReviewAnswerRequest,
    SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::services::attempt_service::AttemptFilter;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/attempts/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Attempt graded", body = SubmitAttemptResponse),
        (status = 403, description = "Not the attempt owner or window expired"),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt already submitted"),
    ),
)]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<Response> {
    req.validate()?;
    let (attempt, sheet) = state
        .attempt_service
        .submit_attempt(attempt_id, &user, req.answers)
        .await?;

    let response = SubmitAttemptResponse {
        attempt_id: attempt.id,
        status: attempt.status_label().to_string(),
        total_score: sheet.total_score,
        max_score: sheet.max_score,
        percentage: sheet.percentage.to_f64().unwrap_or(0.0),
        passed: sheet.passed,
        needs_review: sheet.needs_review,
        per_question: sheet.per_question,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Response> {
    let attempt = state.attempt_service.get_attempt(attempt_id, &user).await?;
    Ok(Json(AttemptDetail::from_model(&attempt)).into_response())
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListAttemptsQuery>,
) -> Result<Response> {
    if !user.role.can_review_attempts() {
        return Err(Error::Forbidden(
            "Reviewing attempts requires an HR or admin role".to_string(),
        ));
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let filter = AttemptFilter {
        test_id: query.test_id,
        user_id: query.user_id,
        needs_review: query.needs_review,
    };
    let (rows, total) = state.attempt_service.list_attempts(filter, page, limit).await?;
    let total_pages = (total + limit - 1) / limit;

    let response = PaginatedAttempts {
        items: rows.iter().map(AttemptDetail::from_model).collect(),
        total,
        page,
        per_page: limit,
        total_pages,
    };
    Ok(Json(response).into_response())
}

pub async fn review_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((attempt_id, question_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ReviewAnswerRequest>,
) -> Result<Response> {
    req.validate()?;
    if !user.role.can_review_attempts() {
        return Err(Error::Forbidden(
            "Reviewing attempts requires an HR or admin role".to_string(),
        ));
    }

    let attempt = state
        .attempt_service
        .review_answer(attempt_id, question_id, req.is_correct, &user)
        .await?;
    Ok(Json(AttemptDetail::from_model(&attempt)).into_response())
}
