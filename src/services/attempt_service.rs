use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::question::Question;
use crate::models::test::Test;
use crate::models::test_attempt::TestAttempt;
use crate::services::scoring_service::{QuestionResult, ScoreSheet, ScoringEngine};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct AttemptFilter {
    pub test_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub needs_review: Option<bool>,
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    scoring: ScoringConfig,
}

impl AttemptService {
    pub fn new(pool: PgPool, scoring: ScoringConfig) -> Self {
        Self { pool, scoring }
    }

    /// Open a new attempt on a published test.
    ///
    /// One open attempt per (test, user): a second start while the first is
    /// unsubmitted trips the partial unique index and surfaces as Conflict.
    pub async fn start_attempt(&self, test_id: Uuid, user: &AuthUser) -> Result<TestAttempt> {
        if !user.role.can_take_tests() {
            return Err(Error::Forbidden(
                "Your role is not permitted to take tests".to_string(),
            ));
        }

        let test = sqlx::query_as::<_, Test>(
            r#"SELECT * FROM tests WHERE id = $1 AND is_published = TRUE"#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found or not available".to_string()))?;

        let now = Utc::now();
        let deadline = now + Duration::minutes(test.duration_minutes as i64);

        let attempt = sqlx::query_as::<_, TestAttempt>(
            r#"
            INSERT INTO test_attempts (test_id, user_id, started_at, deadline)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(test.id)
        .bind(user.id)
        .bind(now)
        .bind(deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Conflict(
                "An unfinished attempt for this test already exists".to_string(),
            ),
            other => Error::from(other),
        })?;

        tracing::info!(
            attempt_id = %attempt.id,
            test_id = %test.id,
            user_id = %user.id,
            "attempt started"
        );
        Ok(attempt)
    }

    /// Grade and close an attempt. The check-then-set on `submitted_at` is
    /// done in the UPDATE itself so two racing submits cannot both win.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        user: &AuthUser,
        answers: HashMap<Uuid, String>,
    ) -> Result<(TestAttempt, ScoreSheet)> {
        let attempt = self.get_attempt_row(attempt_id).await?;
        if attempt.user_id != user.id {
            return Err(Error::Forbidden(
                "Attempt belongs to a different user".to_string(),
            ));
        }
        if attempt.is_submitted() {
            return Err(Error::Conflict(
                "Attempt has already been submitted".to_string(),
            ));
        }

        let now = Utc::now();
        let cutoff = attempt.deadline + Duration::seconds(self.scoring.submit_grace_seconds);
        if now > cutoff {
            tracing::warn!(attempt_id = %attempt.id, deadline = %attempt.deadline, "late submission rejected");
            return Err(Error::Forbidden("Attempt window has expired".to_string()));
        }

        let questions = self.load_questions(attempt.test_id).await?;
        if questions.is_empty() {
            return Err(Error::Internal("Test has no questions".to_string()));
        }

        let sheet = ScoringEngine::score(&questions, &answers, &self.scoring);

        let answers_json = serde_json::to_value(&answers)?;
        let graded_json = serde_json::to_value(&sheet.per_question)?;

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET submitted_at = $2, answers = $3, graded_answers = $4,
                total_score = $5, max_score = $6, percentage = $7, passed = $8,
                needs_review = $9, updated_at = NOW()
            WHERE id = $1 AND submitted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(now)
        .bind(answers_json)
        .bind(graded_json)
        .bind(sheet.total_score)
        .bind(sheet.max_score)
        .bind(sheet.percentage)
        .bind(sheet.passed)
        .bind(sheet.needs_review)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Conflict("Attempt has already been submitted".to_string()))?;

        tracing::info!(
            attempt_id = %updated.id,
            total_score = sheet.total_score,
            max_score = sheet.max_score,
            passed = sheet.passed,
            needs_review = sheet.needs_review,
            "attempt graded"
        );
        Ok((updated, sheet))
    }

    /// Owner sees their own attempt; reviewers see any.
    pub async fn get_attempt(&self, attempt_id: Uuid, user: &AuthUser) -> Result<TestAttempt> {
        let attempt = self.get_attempt_row(attempt_id).await?;
        if attempt.user_id != user.id && !user.role.can_review_attempts() {
            return Err(Error::Forbidden(
                "Attempt belongs to a different user".to_string(),
            ));
        }
        Ok(attempt)
    }

    pub async fn list_attempts(
        &self,
        filter: AttemptFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<TestAttempt>, i64)> {
        let offset = (page - 1) * limit;
        let rows = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE ($1::uuid IS NULL OR test_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::bool IS NULL OR needs_review = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.test_id)
        .bind(filter.user_id)
        .bind(filter.needs_review)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_attempts
            WHERE ($1::uuid IS NULL OR test_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::bool IS NULL OR needs_review = $3)
            "#,
        )
        .bind(filter.test_id)
        .bind(filter.user_id)
        .bind(filter.needs_review)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Reviewer override for one question on a submitted attempt. Totals,
    /// percentage and the pass flag are recomputed from the stored
    /// per-question results; the review flag clears once nothing is left
    /// flagged.
    pub async fn review_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        is_correct: bool,
        reviewer: &AuthUser,
    ) -> Result<TestAttempt> {
        let attempt = self.get_attempt_row(attempt_id).await?;
        if !attempt.is_submitted() {
            return Err(Error::Conflict(
                "Attempt has not been submitted yet".to_string(),
            ));
        }

        let graded = attempt
            .graded_answers
            .clone()
            .ok_or_else(|| Error::Internal("Attempt has no graded answers".to_string()))?;
        let mut results: Vec<QuestionResult> = serde_json::from_value(graded)?;

        let idx = results
            .iter()
            .position(|r| r.question_id == question_id)
            .ok_or_else(|| Error::NotFound("Question is not part of this attempt".to_string()))?;
        if results[idx].excluded {
            return Err(Error::BadRequest(
                "Question is excluded from scoring".to_string(),
            ));
        }

        {
            let entry = &mut results[idx];
            entry.is_correct = is_correct;
            entry.points_awarded = if is_correct { entry.max_points } else { 0 };
            entry.needs_review = false;
        }

        let total_score: i32 = results
            .iter()
            .filter(|r| !r.excluded)
            .map(|r| r.points_awarded)
            .sum();
        let max_score: i32 = results
            .iter()
            .filter(|r| !r.excluded)
            .map(|r| r.max_points)
            .sum();
        let percentage = ScoringEngine::percentage(total_score, max_score);
        let passed = percentage >= self.scoring.passing_threshold;
        let needs_review = results.iter().any(|r| r.needs_review);

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET graded_answers = $2, total_score = $3, max_score = $4,
                percentage = $5, passed = $6, needs_review = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(serde_json::to_value(&results)?)
        .bind(total_score)
        .bind(max_score)
        .bind(percentage)
        .bind(passed)
        .bind(needs_review)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            attempt_id = %attempt_id,
            question_id = %question_id,
            reviewer_id = %reviewer.id,
            is_correct,
            "answer review recorded"
        );
        Ok(updated)
    }

    async fn get_attempt_row(&self, attempt_id: Uuid) -> Result<TestAttempt> {
        sqlx::query_as::<_, TestAttempt>(r#"SELECT * FROM test_attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    async fn load_questions(&self, test_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE test_id = $1 ORDER BY position, created_at"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
