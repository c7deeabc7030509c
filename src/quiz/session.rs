use std::collections::BTreeMap;

use log::info;

use crate::quiz::judge::{AnswerJudge, Evaluation};
use crate::quiz::source::QuestionSource;
use crate::quiz::{Question, QuizError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Answering,
    ReadyToEvaluate,
    Evaluated,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluatedAnswer {
    pub question_index: usize,
    pub student_answer: String,
    pub evaluation: Evaluation,
}

/// Quiz state of a single chat.
///
/// Answers are only ever inserted at `current_question`, which then moves forward,
/// so the ascending key order of `answers` is also their insertion order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizSession {
    questions: Vec<Question>,
    current_question: usize,
    answers: BTreeMap<usize, String>,
    evaluation_complete: bool,
    total_questions: usize,
    evaluations: Vec<EvaluatedAnswer>,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fetches the questions for `topic`. On failure the session is left untouched.
    pub async fn start_quiz(
        &mut self,
        source: &QuestionSource,
        topic: &str,
    ) -> Result<usize, QuizError> {
        if self.phase() != Phase::Empty {
            return Err(QuizError::AlreadyStarted);
        }
        if topic.trim().is_empty() {
            return Err(QuizError::EmptyTopic);
        }

        let questions = source.fetch(topic, source.default_count()).await;
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        self.total_questions = questions.len();
        self.questions = questions;
        info!("Quiz about {:?} started with {} questions", topic.trim(), self.total_questions);

        Ok(self.total_questions)
    }

    pub fn submit_answer(&mut self, answer: &str) -> Result<(), QuizError> {
        if self.current_question >= self.total_questions {
            return Err(QuizError::NoPendingQuestion);
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(QuizError::EmptyAnswer);
        }

        self.answers.insert(self.current_question, answer.to_string());
        self.current_question += 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.total_questions > 0 && self.answers.len() == self.total_questions
    }

    /// Judges every recorded answer in insertion order.
    ///
    /// The results are kept in the session, so calling this again returns them without
    /// asking the provider a second time.
    pub async fn run_evaluation(
        &mut self,
        judge: &AnswerJudge,
    ) -> Result<&[EvaluatedAnswer], QuizError> {
        if self.evaluation_complete {
            return Ok(&self.evaluations);
        }
        if !self.is_complete() {
            return Err(QuizError::NotComplete);
        }

        let mut evaluations = Vec::with_capacity(self.answers.len());
        for (&question_index, answer) in &self.answers {
            let evaluation = judge.evaluate(&self.questions[question_index], answer).await;
            evaluations.push(EvaluatedAnswer {
                question_index,
                student_answer: answer.clone(),
                evaluation,
            });
        }

        self.evaluations = evaluations;
        self.evaluation_complete = true;
        info!(
            "Quiz evaluated: {} of {} correct",
            self.correct_count().unwrap_or_default(),
            self.total_questions
        );

        Ok(&self.evaluations)
    }

    pub fn correct_count(&self) -> Option<usize> {
        if !self.evaluation_complete {
            return None;
        }
        Some(
            self.evaluations
                .iter()
                .filter(|answer| answer.evaluation.is_correct)
                .count(),
        )
    }

    /// Percentage of correct answers, once the evaluation has run.
    pub fn score(&self) -> Option<f64> {
        let correct = self.correct_count()?;
        if self.total_questions == 0 {
            return None;
        }
        Some(correct as f64 / self.total_questions as f64 * 100.0)
    }

    pub fn progress(&self) -> Option<f64> {
        if self.total_questions == 0 {
            return None;
        }
        Some(self.current_question as f64 / self.total_questions as f64)
    }

    pub fn phase(&self) -> Phase {
        if self.total_questions == 0 {
            Phase::Empty
        } else if self.evaluation_complete {
            Phase::Evaluated
        } else if self.is_complete() {
            Phase::ReadyToEvaluate
        } else {
            Phase::Answering
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    pub fn current_index(&self) -> usize {
        self.current_question
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    /// Evaluated answers next to their questions, in answer order.
    pub fn results(&self) -> impl Iterator<Item = (&Question, &EvaluatedAnswer)> + '_ {
        self.evaluations
            .iter()
            .map(move |answer| (&self.questions[answer.question_index], answer))
    }
}
