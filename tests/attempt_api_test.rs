use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use assessment_backend::middleware::auth::Claims;

const JWT_SECRET: &str = "test_secret_key";

fn bearer(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode jwt");
    format!("Bearer {}", token)
}

async fn read_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn attempt_flow_end_to_end() {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping attempt_flow_end_to_end");
        return;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("PUBLIC_RPS", "100");
    env::set_var("REVIEW_RPS", "100");
    env::set_var("PASSING_THRESHOLD_PERCENT", "50");
    env::set_var("TEXT_GRADING_POLICY", "manual_review");
    env::set_var("SUBMIT_GRACE_SECONDS", "30");

    assessment_backend::config::init_config().expect("init config");
    let pool = assessment_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    // Seed a published test with two choice questions and one text question.
    let test_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO tests (title, description, duration_minutes, is_published)
           VALUES ($1, $2, $3, TRUE) RETURNING id"#,
    )
    .bind("Rust basics")
    .bind("Screening test")
    .bind(30i32)
    .fetch_one(&pool)
    .await
    .expect("seed test");

    let q1: Uuid = seed_choice_question(&pool, test_id, 1, "B", 10).await;
    let q2: Uuid = seed_choice_question(&pool, test_id, 2, "A", 10).await;
    let q3: Uuid = sqlx::query_scalar(
        r#"INSERT INTO questions (test_id, position, content, question_type, correct_answer, score)
           VALUES ($1, $2, $3, 'text', $4, $5) RETURNING id"#,
    )
    .bind(test_id)
    .bind(3i32)
    .bind("Explain borrowing")
    .bind("references without ownership")
    .bind(5i32)
    .fetch_one(&pool)
    .await
    .expect("seed text question");

    let unpublished_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO tests (title, duration_minutes, is_published)
           VALUES ($1, $2, FALSE) RETURNING id"#,
    )
    .bind("Draft test")
    .bind(15i32)
    .fetch_one(&pool)
    .await
    .expect("seed draft test");

    let app_state = assessment_backend::AppState::new(pool.clone());
    let app = Router::new()
        .route("/api/tests", get(assessment_backend::routes::tests::list_tests))
        .route("/api/tests/:id", get(assessment_backend::routes::tests::get_test))
        .route(
            "/api/tests/:id/start",
            post(assessment_backend::routes::tests::start_attempt),
        )
        .route(
            "/api/attempts/:id",
            get(assessment_backend::routes::attempts::get_attempt),
        )
        .route(
            "/api/attempts/:id/submit",
            post(assessment_backend::routes::attempts::submit_attempt),
        )
        .route(
            "/api/attempts",
            get(assessment_backend::routes::attempts::list_attempts),
        )
        .route(
            "/api/attempts/:id/questions/:question_id/review",
            post(assessment_backend::routes::attempts::review_answer),
        )
        .layer(axum::middleware::from_fn(
            assessment_backend::middleware::auth::require_bearer_auth,
        ))
        .with_state(app_state);

    let candidate = Uuid::new_v4();
    let other_candidate = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    // No token -> 401.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/tests/{}", test_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Published test is listed and redacted.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/tests/{}", test_id))
                .header("authorization", bearer(candidate, "candidate"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["total_questions"], 3);
    let raw = body.to_string();
    assert!(!raw.contains("is_correct"));
    assert!(!raw.contains("correct_answer"));

    // Catalog lists only published tests.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/tests?page=1&limit=50")
                .header("authorization", bearer(candidate, "candidate"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    let items = body["items"].as_array().unwrap();
    assert!(items.iter().any(|t| t["id"] == json!(test_id.to_string())));
    assert!(!items
        .iter()
        .any(|t| t["id"] == json!(unpublished_id.to_string())));

    // HR may not take tests.
    let resp = app
        .clone()
        .oneshot(start_request(test_id, bearer(reviewer, "hr")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Unpublished test reads as missing.
    let resp = app
        .clone()
        .oneshot(start_request(unpublished_id, bearer(candidate, "candidate")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Start, then a second open attempt is refused.
    let resp = app
        .clone()
        .oneshot(start_request(test_id, bearer(candidate, "candidate")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = read_json(resp).await;
    let attempt_id = body["attempt_id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], "started");

    let resp = app
        .clone()
        .oneshot(start_request(test_id, bearer(candidate, "candidate")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Another user cannot submit this attempt.
    let submit_body = json!({
        "answers": { q1.to_string(): "B", q2.to_string(): "C", q3.to_string(): "it borrows" }
    });
    let resp = app
        .clone()
        .oneshot(submit_request(
            &attempt_id,
            bearer(other_candidate, "candidate"),
            &submit_body,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Owner submits: q1 right, q2 wrong, q3 pending review.
    let resp = app
        .clone()
        .oneshot(submit_request(
            &attempt_id,
            bearer(candidate, "candidate"),
            &submit_body,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["total_score"], 10);
    assert_eq!(body["max_score"], 25);
    assert_eq!(body["passed"], false);
    assert_eq!(body["needs_review"], true);
    assert_eq!(body["status"], "needs_review");

    // Second submit -> conflict, stored result untouched.
    let resp = app
        .clone()
        .oneshot(submit_request(
            &attempt_id,
            bearer(candidate, "candidate"),
            &json!({"answers": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Owner reads their attempt; a stranger may not.
    let resp = app
        .clone()
        .oneshot(get_attempt_request(&attempt_id, bearer(candidate, "candidate")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["total_score"], 10);

    let resp = app
        .clone()
        .oneshot(get_attempt_request(
            &attempt_id,
            bearer(other_candidate, "candidate"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Review listing is HR-only.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/attempts?needs_review=true")
                .header("authorization", bearer(candidate, "candidate"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/attempts?needs_review=true")
                .header("authorization", bearer(reviewer, "hr"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert!(body["total"].as_i64().unwrap() >= 1);

    // HR accepts the text answer: 15/25 = 60% clears the 50% threshold.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/attempts/{}/questions/{}/review",
                    attempt_id, q3
                ))
                .header("authorization", bearer(reviewer, "hr"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"is_correct": true}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["total_score"], 15);
    assert_eq!(body["passed"], true);
    assert_eq!(body["needs_review"], false);
    assert_eq!(body["status"], "submitted");

    sqlx::query("DELETE FROM tests WHERE id = $1 OR id = $2")
        .bind(test_id)
        .bind(unpublished_id)
        .execute(&pool)
        .await
        .expect("cleanup");
}

async fn seed_choice_question(
    pool: &sqlx::PgPool,
    test_id: Uuid,
    position: i32,
    correct: &str,
    score: i32,
) -> Uuid {
    let options = json!([
        {"id": "A", "content": "first option", "is_correct": correct == "A"},
        {"id": "B", "content": "second option", "is_correct": correct == "B"},
        {"id": "C", "content": "third option", "is_correct": correct == "C"},
    ]);
    sqlx::query_scalar(
        r#"INSERT INTO questions (test_id, position, content, question_type, correct_answer, score, answer_options)
           VALUES ($1, $2, $3, 'multiple_choice', $4, $5, $6) RETURNING id"#,
    )
    .bind(test_id)
    .bind(position)
    .bind(format!("question {}", position))
    .bind(correct)
    .bind(score)
    .bind(options)
    .fetch_one(pool)
    .await
    .expect("seed choice question")
}

fn start_request(test_id: Uuid, auth: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/tests/{}/start", test_id))
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

fn submit_request(attempt_id: &str, auth: String, body: &JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/attempts/{}/submit", attempt_id))
        .header("authorization", auth)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_attempt_request(attempt_id: &str, auth: String) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/api/attempts/{}", attempt_id))
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}
