use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One attempt row. Created at start (submitted_at NULL), written exactly
/// once at submit, after which only review overrides touch the grading
/// columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: Option<JsonValue>,
    pub graded_answers: Option<JsonValue>,
    pub total_score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<Decimal>,
    pub passed: Option<bool>,
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestAttempt {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn status_label(&self) -> &'static str {
        if !self.is_submitted() {
            "started"
        } else if self.needs_review {
            "needs_review"
        } else {
            "submitted"
        }
    }
}
