use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::Value;

use crate::quiz::ai_helper::{ask, CompletionProvider};
use crate::quiz::prompts::question_generation_prompt;
use crate::quiz::{Difficulty, Letter, Question, QuizError};

/// Turns a topic into a list of questions with one provider round trip.
pub struct QuestionSource {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
    default_count: usize,
}

impl QuestionSource {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        timeout: Duration,
        default_count: usize,
    ) -> Self {
        Self {
            provider,
            timeout,
            default_count,
        }
    }

    pub fn default_count(&self) -> usize {
        self.default_count
    }

    /// Questions about `topic`, or an empty list if anything went wrong.
    pub async fn fetch(&self, topic: &str, count: usize) -> Vec<Question> {
        match self.try_fetch(topic, count).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!("Could not generate questions about {:?}: {}", topic, err);
                Vec::new()
            }
        }
    }

    pub async fn try_fetch(&self, topic: &str, count: usize) -> Result<Vec<Question>, QuizError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(QuizError::EmptyTopic);
        }

        info!("Generating {} questions about {:?}", count, topic);
        let prompt = question_generation_prompt(topic, count);
        let content = ask(self.provider.as_ref(), &prompt, self.timeout).await?;

        let questions = parse_questions(&content)?;
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        info!("Got {} usable questions (asked for {})", questions.len(), count);
        Ok(questions)
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
    difficulty: String,
    #[serde(default)]
    topic_area: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum MalformedQuestion {
    #[error("unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("question text is empty")]
    EmptyText,
    #[error("expected 4 options, got {0}")]
    OptionCount(usize),
    #[error("correct answer {0:?} is not one of A-D")]
    CorrectAnswer(String),
    #[error("unknown difficulty {0:?}")]
    Difficulty(String),
}

/// Parses the provider reply. Individual malformed questions are dropped, not the whole batch.
fn parse_questions(content: &str) -> Result<Vec<Question>, serde_json::Error> {
    let document: Value = serde_json::from_str(json_block(content))?;

    let Some(items) = document.get("questions").and_then(Value::as_array) else {
        warn!("Provider reply has no \"questions\" list");
        return Ok(Vec::new());
    };

    let questions = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match validate(item) {
            Ok(question) => Some(question),
            Err(err) => {
                warn!("Dropping question #{}: {}", i + 1, err);
                None
            }
        })
        .collect();

    Ok(questions)
}

fn validate(item: &Value) -> Result<Question, MalformedQuestion> {
    let raw: RawQuestion = serde_json::from_value(item.clone())?;

    let text = raw.question.trim();
    if text.is_empty() {
        return Err(MalformedQuestion::EmptyText);
    }

    let options: [String; 4] = raw
        .options
        .try_into()
        .map_err(|options: Vec<String>| MalformedQuestion::OptionCount(options.len()))?;

    let correct_answer = Letter::parse_labeled(&raw.correct_answer)
        .ok_or(MalformedQuestion::CorrectAnswer(raw.correct_answer))?;

    let difficulty =
        Difficulty::parse(&raw.difficulty).ok_or(MalformedQuestion::Difficulty(raw.difficulty))?;

    let topic_area = raw
        .topic_area
        .map(|area| area.trim().to_string())
        .filter(|area| !area.is_empty());

    Ok(Question {
        text: text.to_string(),
        options,
        correct_answer,
        explanation: raw.explanation.trim().to_string(),
        difficulty,
        topic_area,
    })
}

// Models like to wrap JSON in markdown fences or a sentence of prose.
fn json_block(content: &str) -> &str {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::ai_helper::tests::{backend_error, SlowProvider};
    use crate::quiz::ai_helper::MockCompletionProvider;

    const TWO_QUESTIONS: &str = r#"{
        "questions": [
            {
                "question": "What gas do plants absorb?",
                "options": ["A) Oxygen", "B) Carbon dioxide", "C) Nitrogen", "D) Helium"],
                "correct_answer": "B",
                "explanation": "Plants take in CO2 for photosynthesis.",
                "difficulty": "easy",
                "topic_area": "Inputs"
            },
            {
                "question": "Where does the Calvin cycle happen?",
                "options": ["A) Stroma", "B) Thylakoid", "C) Nucleus", "D) Cell wall"],
                "correct_answer": "a",
                "explanation": "The Calvin cycle runs in the stroma.",
                "difficulty": "Hard"
            }
        ]
    }"#;

    fn source_replying(reply: &'static str) -> QuestionSource {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(move |_| Ok(reply.to_string()));
        QuestionSource::new(Arc::new(provider), Duration::from_secs(5), 10)
    }

    #[test]
    fn parses_well_formed_reply() {
        let questions = parse_questions(TWO_QUESTIONS).unwrap();
        assert_eq!(questions.len(), 2);

        assert_eq!(questions[0].text, "What gas do plants absorb?");
        assert_eq!(questions[0].correct_answer, Letter::B);
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
        assert_eq!(questions[0].topic_area.as_deref(), Some("Inputs"));

        assert_eq!(questions[1].correct_answer, Letter::A);
        assert_eq!(questions[1].difficulty, Difficulty::Hard);
        assert_eq!(questions[1].topic_area, None);
    }

    #[test]
    fn tolerates_markdown_fences() {
        let fenced = format!("Here you go:\n```json\n{}\n```", TWO_QUESTIONS);
        assert_eq!(parse_questions(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn missing_questions_field_means_no_questions() {
        assert!(parse_questions(r#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_questions(r#"{"questions": "none"}"#).unwrap().is_empty());
    }

    #[test]
    fn unparsable_reply_is_an_error() {
        assert!(parse_questions("I cannot help with that.").is_err());
    }

    #[test]
    fn malformed_questions_are_dropped_individually() {
        let reply = r#"{"questions": [
            {"question": "Three options", "options": ["A) 1", "B) 2", "C) 3"],
             "correct_answer": "A", "explanation": "", "difficulty": "easy"},
            {"question": "Bad letter", "options": ["A) 1", "B) 2", "C) 3", "D) 4"],
             "correct_answer": "E", "explanation": "", "difficulty": "easy"},
            {"question": "Bad difficulty", "options": ["A) 1", "B) 2", "C) 3", "D) 4"],
             "correct_answer": "A", "explanation": "", "difficulty": "expert"},
            {"question": "No explanation", "options": ["A) 1", "B) 2", "C) 3", "D) 4"],
             "correct_answer": "A", "difficulty": "easy"},
            {"question": "  ", "options": ["A) 1", "B) 2", "C) 3", "D) 4"],
             "correct_answer": "A", "explanation": "", "difficulty": "easy"},
            {"question": "Fine", "options": ["A) 1", "B) 2", "C) 3", "D) 4"],
             "correct_answer": "D)", "explanation": "four", "difficulty": "medium"}
        ]}"#;

        let questions = parse_questions(reply).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Fine");
        assert_eq!(questions[0].correct_answer, Letter::D);
    }

    #[tokio::test]
    async fn fetch_returns_parsed_questions() {
        let source = source_replying(TWO_QUESTIONS);
        let questions = source.fetch("Photosynthesis", 2).await;
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn fetch_sends_topic_and_count_in_prompt() {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .withf(|prompt: &str| {
                prompt.starts_with("Generate 6 multiple choice questions about World War II.")
            })
            .times(1)
            .returning(|_| Ok(TWO_QUESTIONS.to_string()));
        let source = QuestionSource::new(Arc::new(provider), Duration::from_secs(5), 10);

        assert_eq!(source.fetch("  World War II ", 6).await.len(), 2);
    }

    #[tokio::test]
    async fn fetch_is_empty_on_garbage() {
        let source = source_replying("not json at all");
        assert!(source.fetch("Trigonometry", 10).await.is_empty());
    }

    #[tokio::test]
    async fn empty_topic_skips_the_provider() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().never();
        let source = QuestionSource::new(Arc::new(provider), Duration::from_secs(5), 10);

        assert!(matches!(
            source.try_fetch("   ", 10).await,
            Err(QuizError::EmptyTopic)
        ));
        assert!(source.fetch("", 10).await.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_error() {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .returning(|_| Err(backend_error()));
        let source = QuestionSource::new(Arc::new(provider), Duration::from_secs(5), 10);

        assert!(matches!(
            source.try_fetch("Chemistry", 10).await,
            Err(QuizError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn all_questions_dropped_is_no_questions() {
        let source = source_replying(r#"{"questions": [{"question": "Only this"}]}"#);
        assert!(matches!(
            source.try_fetch("Chemistry", 10).await,
            Err(QuizError::NoQuestions)
        ));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let source = QuestionSource::new(
            Arc::new(SlowProvider(Duration::from_millis(500))),
            Duration::from_millis(20),
            10,
        );
        assert!(source.fetch("Chemistry", 10).await.is_empty());
    }
}
