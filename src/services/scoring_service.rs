use crate::config::{ScoringConfig, TextGradingPolicy};
use crate::models::question::{Question, QuestionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Grading outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub is_correct: bool,
    pub points_awarded: i32,
    pub max_points: i32,
    pub needs_review: bool,
    pub excluded: bool,
}

/// Full grading result for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSheet {
    pub per_question: Vec<QuestionResult>,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: Decimal,
    pub passed: bool,
    pub needs_review: bool,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Grade a submitted answers map against a test's question set.
    ///
    /// Pure fold over the question list: no I/O, no randomness, identical
    /// inputs always produce an identical sheet. Unanswered questions score
    /// zero; answer entries for unknown question ids are ignored.
    pub fn score(
        questions: &[Question],
        answers: &HashMap<Uuid, String>,
        config: &ScoringConfig,
    ) -> ScoreSheet {
        let mut per_question = Vec::with_capacity(questions.len());
        let mut total_score: i32 = 0;
        let mut max_score: i32 = 0;
        let mut needs_review = false;

        for q in questions {
            let submitted = answers.get(&q.id).map(String::as_str);
            let result = match q.kind() {
                QuestionType::MultipleChoice => {
                    let is_correct = submitted
                        .map(|s| Self::is_correct_choice(q, s))
                        .unwrap_or(false);
                    QuestionResult {
                        question_id: q.id,
                        is_correct,
                        points_awarded: if is_correct { q.score } else { 0 },
                        max_points: q.score,
                        needs_review: false,
                        excluded: false,
                    }
                }
                QuestionType::Text => Self::grade_text(q, submitted, config.text_policy),
            };

            if !result.excluded {
                total_score += result.points_awarded;
                max_score += result.max_points;
            }
            needs_review |= result.needs_review;
            per_question.push(result);
        }

        let percentage = Self::percentage(total_score, max_score);
        let passed = percentage >= config.passing_threshold;

        ScoreSheet {
            per_question,
            total_score,
            max_score,
            percentage,
            passed,
            needs_review,
        }
    }

    pub fn percentage(total_score: i32, max_score: i32) -> Decimal {
        if max_score > 0 {
            (Decimal::from(total_score) * Decimal::from(100) / Decimal::from(max_score)).round_dp(2)
        } else {
            Decimal::ZERO
        }
    }

    /// A choice is correct when the submitted value matches the reference
    /// answer or names the option flagged correct.
    fn is_correct_choice(question: &Question, submitted: &str) -> bool {
        let submitted = submitted.trim();
        if submitted == question.correct_answer.trim() {
            return true;
        }
        question
            .options()
            .iter()
            .any(|o| o.is_correct && o.id == submitted)
    }

    fn grade_text(
        question: &Question,
        submitted: Option<&str>,
        policy: TextGradingPolicy,
    ) -> QuestionResult {
        match policy {
            TextGradingPolicy::ManualReview => QuestionResult {
                question_id: question.id,
                is_correct: false,
                points_awarded: 0,
                max_points: question.score,
                needs_review: true,
                excluded: false,
            },
            TextGradingPolicy::ExactMatch => {
                let is_correct = submitted
                    .map(|s| s.trim().eq_ignore_ascii_case(question.correct_answer.trim()))
                    .unwrap_or(false);
                QuestionResult {
                    question_id: question.id,
                    is_correct,
                    points_awarded: if is_correct { question.score } else { 0 },
                    max_points: question.score,
                    needs_review: false,
                    excluded: false,
                }
            }
            TextGradingPolicy::Exclude => QuestionResult {
                question_id: question.id,
                is_correct: false,
                points_awarded: 0,
                max_points: question.score,
                needs_review: false,
                excluded: true,
            },
        }
    }
}
