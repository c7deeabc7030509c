use teloxide::utils::html::{bold, escape, italic};

use crate::quiz::session::{EvaluatedAnswer, QuizSession};
use crate::quiz::{Letter, Question};

// Keeps a result message well under Telegram's 4096 character limit.
const MAX_FEEDBACK_CHARS: usize = 2500;
const MAX_EXPLANATION_CHARS: usize = 600;

pub const GREETING_TEXT: &str = "Welcome to Smart Learning Quiz! 📚\n\
    Choose a subject you'd like to practice. \
    It can be anything from Math to Science to History!\n\n\
    What would you like to learn about today? \
    (for example: Trigonometry, Chemical Reactions, World War II)";
pub const ASK_TOPIC_TEXT: &str = "What would you like to learn about today?";
pub const CREATING_QUIZ_TEXT: &str = "Creating your personalized quiz... 🎯";
pub const QUIZ_FAILED_TEXT: &str =
    "Oops! I could not create your quiz. Let's try again! 😅\nSend me a topic.";
pub const EMPTY_TOPIC_TEXT: &str = "Please send the topic as a text message.";
pub const NOT_A_TOPIC_TEXT: &str =
    "Commands can't be a topic. Send me a subject, for example \"Photosynthesis\".";
pub const PICK_OPTION_TEXT: &str = "Please choose one of the options: A, B, C or D.";
pub const COMPLETED_TEXT: &str = "🎉 You've completed all questions!";
pub const EVALUATING_TEXT: &str = "Checking your answers... 🧐";
pub const SEE_RESULTS_BUTTON: &str = "See How You Did! 🌟";
pub const SHOW_AGAIN_BUTTON: &str = "Show results again";
pub const NEW_QUIZ_BUTTON: &str = "Start a New Quiz! 🚀";
pub const FEEDBACK_UNAVAILABLE_TEXT: &str =
    "Feedback is not available for this question right now.";

/// The question currently waiting for an answer, or `None` once all are answered.
pub fn question_message(session: &QuizSession) -> Option<String> {
    let question = session.current_question()?;
    let number = session.current_index() + 1;
    let total = session.total_questions();

    let mut text = format!(
        "{}\n{} · {}\n",
        progress_line(session.progress().unwrap_or_default()),
        bold(&format!("Question {} of {} 📝", number, total)),
        question.difficulty.label()
    );
    if let Some(area) = &question.topic_area {
        text.push_str(&italic(&format!("Topic Area: {}", escape(area))));
        text.push('\n');
    }
    text.push('\n');
    text.push_str(&bold(&escape(&question.text)));
    text.push_str("\n\n");
    for letter in Letter::ALL {
        text.push_str(&format!("{}) {}\n", letter, escape(question.option_text(letter))));
    }

    Some(text)
}

pub fn progress_line(fraction: f64) -> String {
    const WIDTH: usize = 10;
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * WIDTH as f64).round() as usize;
    format!(
        "{}{} {:.0}%",
        "▓".repeat(filled),
        "░".repeat(WIDTH - filled),
        fraction * 100.0
    )
}

pub fn result_message(number: usize, question: &Question, answer: &EvaluatedAnswer) -> String {
    let verdict = if answer.evaluation.is_correct {
        "✅ Correct!"
    } else {
        "❌ Let's Review"
    };
    let feedback = answer
        .evaluation
        .feedback
        .as_deref()
        .unwrap_or(FEEDBACK_UNAVAILABLE_TEXT);

    let mut text = format!(
        "{}\n\n{} {}\n{} Option {}\n{} Option {}\n\n{}\n{}",
        bold(&format!("Question {} - {}", number, verdict)),
        bold("Question:"),
        escape(&question.text),
        bold("Your Answer:"),
        escape(&answer.student_answer),
        bold("Correct Answer:"),
        question.correct_answer,
        bold("Feedback:"),
        escape(&truncate(feedback, MAX_FEEDBACK_CHARS)),
    );
    if !answer.evaluation.is_correct && !question.explanation.is_empty() {
        text.push_str(&format!(
            "\n\n{}\n{}",
            bold("💡 Keep Learning:"),
            escape(&truncate(&question.explanation, MAX_EXPLANATION_CHARS))
        ));
    }

    text
}

pub fn score_message(score: f64, correct: usize, total: usize) -> String {
    format!(
        "{}\n{:.1}% ({} of {} correct)\n\n{}",
        bold("Your Score:"),
        score,
        correct,
        total,
        encouragement(score)
    )
}

pub fn encouragement(score: f64) -> &'static str {
    if score >= 100.0 {
        "🌟 Perfect Score! You're Amazing! 🌟"
    } else if score >= 80.0 {
        "🎉 Great Job! You're doing excellent! 🌟"
    } else if score >= 60.0 {
        "👍 Good effort! Keep practicing! 💪"
    } else {
        "💪 Keep learning! You'll do better next time! 📚"
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
