use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::quiz::ai_helper::{ask, CompletionProvider};
use crate::quiz::prompts::feedback_prompt;
use crate::quiz::{Letter, Question};

/// Correctness of one answer plus the provider's comments on it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Evaluation {
    pub is_correct: bool,
    /// `None` when the provider could not be reached.
    pub feedback: Option<String>,
}

pub struct AnswerJudge {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl AnswerJudge {
    pub fn new(provider: Arc<dyn CompletionProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn is_correct(question: &Question, student_answer: &str) -> bool {
        Letter::parse_strict(student_answer) == Some(question.correct_answer)
    }

    pub async fn evaluate(&self, question: &Question, student_answer: &str) -> Evaluation {
        let is_correct = Self::is_correct(question, student_answer);
        debug!(
            "Answer {:?} to {:?} is {}",
            student_answer,
            question.text,
            if is_correct { "correct" } else { "wrong" }
        );

        let prompt = feedback_prompt(question, student_answer);
        let feedback = match ask(self.provider.as_ref(), &prompt, self.timeout).await {
            Ok(feedback) => Some(feedback),
            Err(err) => {
                warn!("Feedback for {:?} is unavailable: {}", question.text, err);
                None
            }
        };

        Evaluation {
            is_correct,
            feedback,
        }
    }
}
