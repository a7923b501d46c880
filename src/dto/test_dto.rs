use crate::models::question::{Question, QuestionType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Candidate-facing option view. Deliberately has no `is_correct` field so
/// the flag can never leak through serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAnswerOption {
    pub id: String,
    pub content: String,
}

/// Candidate-facing question view: no reference answer either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub position: i32,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_options: Option<Vec<PublicAnswerOption>>,
}

impl PublicQuestion {
    pub fn from_model(q: &Question) -> Self {
        let answer_options = match q.kind() {
            QuestionType::MultipleChoice => Some(
                q.options()
                    .into_iter()
                    .map(|o| PublicAnswerOption {
                        id: o.id,
                        content: o.content,
                    })
                    .collect(),
            ),
            QuestionType::Text => None,
        };
        Self {
            id: q.id,
            position: q.position,
            content: q.content.clone(),
            question_type: q.kind(),
            score: q.score,
            answer_options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTestResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn public_question_never_leaks_grading_data() {
        let now = Utc::now();
        let q = Question {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            position: 1,
            content: "2 + 2 = ?".into(),
            question_type: "multiple_choice".into(),
            correct_answer: "B".into(),
            score: 10,
            answer_options: Some(json!([
                {"id": "A", "content": "3", "is_correct": false},
                {"id": "B", "content": "4", "is_correct": true},
            ])),
            created_at: now,
            updated_at: now,
        };

        let rendered = serde_json::to_string(&PublicQuestion::from_model(&q)).unwrap();
        assert!(!rendered.contains("is_correct"));
        assert!(!rendered.contains("correct_answer"));
        assert!(rendered.contains("\"B\""));
    }

    #[test]
    fn text_questions_carry_no_options() {
        let now = Utc::now();
        let q = Question {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            position: 2,
            content: "Explain ownership".into(),
            question_type: "text".into(),
            correct_answer: "moves and borrows".into(),
            score: 5,
            answer_options: None,
            created_at: now,
            updated_at: now,
        };

        let public = PublicQuestion::from_model(&q);
        assert!(public.answer_options.is_none());
        let rendered = serde_json::to_string(&public).unwrap();
        assert!(!rendered.contains("correct_answer"));
        assert!(!rendered.contains("answer_options"));
    }
}
