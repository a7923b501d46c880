use crate::models::test_attempt::TestAttempt;
use crate::services::scoring_service::QuestionResult;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 500, message = "Too many answers"))]
    #[schema(value_type = Object)]
    pub answers: HashMap<Uuid, String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub deadline: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitAttemptResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub needs_review: bool,
    pub per_question: Vec<QuestionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviewAnswerRequest {
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAttemptsQuery {
    pub test_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub needs_review: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptDetail {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub deadline: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub needs_review: bool,
    pub per_question: Vec<QuestionResult>,
}

impl AttemptDetail {
    pub fn from_model(attempt: &TestAttempt) -> Self {
        let per_question: Vec<QuestionResult> = attempt
            .graded_answers
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            user_id: attempt.user_id,
            status: attempt.status_label().to_string(),
            started_at: attempt.started_at,
            deadline: attempt.deadline,
            submitted_at: attempt.submitted_at,
            total_score: attempt.total_score,
            max_score: attempt.max_score,
            percentage: attempt.percentage.and_then(|p| p.to_f64()),
            passed: attempt.passed,
            needs_review: attempt.needs_review,
            per_question,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedAttempts {
    pub items: Vec<AttemptDetail>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}
