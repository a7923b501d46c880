use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One question row. `answer_options` holds the ordered option list for
/// multiple-choice questions and is NULL for free-text ones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub test_id: Uuid,
    pub position: i32,
    pub content: String,
    pub question_type: String,
    pub correct_answer: String,
    pub score: i32,
    pub answer_options: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Text => "text",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "text" => Some(QuestionType::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl Question {
    /// Question type as the closed enum. The column carries a CHECK
    /// constraint; anything unexpected falls back to the non-auto-gradable
    /// path.
    pub fn kind(&self) -> QuestionType {
        QuestionType::parse(&self.question_type).unwrap_or(QuestionType::Text)
    }

    pub fn options(&self) -> Vec<AnswerOption> {
        self.answer_options
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}
