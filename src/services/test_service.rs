use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::test::Test;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, serde::Serialize)]
pub struct PaginatedTests {
    #[serde(rename = "items")]
    pub tests: Vec<TestSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct TestSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub question_count: i64,
}

/// Read-only view over the test catalog. Authoring happens elsewhere;
/// this service only ever sees published rows.
#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_published(&self, page: i64, per_page: i64) -> Result<PaginatedTests> {
        let offset = (page - 1) * per_page;

        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM tests WHERE is_published = TRUE"#)
                .fetch_one(&self.pool)
                .await?;

        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            1
        };

        let tests = sqlx::query_as::<_, TestSummary>(
            r#"
            SELECT t.id, t.title, t.description, t.duration_minutes,
                   (SELECT COUNT(*) FROM questions q WHERE q.test_id = t.id) AS question_count
            FROM tests t
            WHERE t.is_published = TRUE
            ORDER BY t.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedTests {
            tests,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Unpublished tests are indistinguishable from missing ones.
    pub async fn get_published_test(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>(
            r#"SELECT * FROM tests WHERE id = $1 AND is_published = TRUE"#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found or not available".to_string()))
    }

    pub async fn questions_for_test(&self, test_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE test_id = $1 ORDER BY position, created_at"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
