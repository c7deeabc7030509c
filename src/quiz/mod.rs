pub mod ai_helper;
pub mod judge;
pub mod prompts;
pub mod session;
pub mod source;

use std::fmt;

use crate::quiz::ai_helper::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("provider request failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("provider response is not valid quiz JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("provider returned no usable questions")]
    NoQuestions,
    #[error("a quiz is already in progress")]
    AlreadyStarted,
    #[error("no question is waiting for an answer")]
    NoPendingQuestion,
    #[error("answer must not be empty")]
    EmptyAnswer,
    #[error("not every question has been answered yet")]
    NotComplete,
}

/// Option label of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn index(self) -> usize {
        match self {
            Letter::A => 0,
            Letter::B => 1,
            Letter::C => 2,
            Letter::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
        }
    }

    /// Reads a bare letter, case-insensitively. Surrounding whitespace is ignored.
    pub fn parse_strict(input: &str) -> Option<Letter> {
        let mut chars = input.trim().chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_char(first)
    }

    /// Reads a letter that may carry an option label, e.g. `"b"`, `"B)"` or `"B) Paris"`.
    pub fn parse_labeled(input: &str) -> Option<Letter> {
        let trimmed = input.trim();
        let mut chars = trimmed.chars();
        let letter = Self::from_char(chars.next()?)?;
        match chars.next() {
            None | Some(')') | Some('.') | Some(':') => Some(letter),
            Some(c) if c.is_whitespace() => Some(letter),
            _ => None,
        }
    }

    fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(input: &str) -> Option<Difficulty> {
        match input.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

/// One validated multiple-choice question. Built once by the question source and never mutated.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub text: String,
    pub options: [String; 4],
    pub correct_answer: Letter,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub topic_area: Option<String>,
}

impl Question {
    /// Option text without its `"A) "` label.
    pub fn option_text(&self, letter: Letter) -> &str {
        strip_option_label(&self.options[letter.index()])
    }
}

fn strip_option_label(option: &str) -> &str {
    let trimmed = option.trim_start();
    let mut chars = trimmed.char_indices();
    if let (Some((_, c)), Some((i, sep))) = (chars.next(), chars.next()) {
        if Letter::from_char(c).is_some() && (sep == ')' || sep == '.') {
            return trimmed[i + sep.len_utf8()..].trim_start();
        }
    }
    trimmed
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn question(text: &str, correct_answer: Letter) -> Question {
        Question {
            text: text.to_string(),
            options: [
                "A) first".to_string(),
                "B) second".to_string(),
                "C) third".to_string(),
                "D) fourth".to_string(),
            ],
            correct_answer,
            explanation: format!("{} is correct", correct_answer),
            difficulty: Difficulty::Easy,
            topic_area: None,
        }
    }

    #[test]
    fn letters_parse_case_insensitively() {
        assert_eq!(Letter::parse_strict("b"), Some(Letter::B));
        assert_eq!(Letter::parse_strict(" D "), Some(Letter::D));
        assert_eq!(Letter::parse_strict("X"), None);
        assert_eq!(Letter::parse_strict("AB"), None);
        assert_eq!(Letter::parse_strict(""), None);
    }

    #[test]
    fn labeled_letters_accept_option_text() {
        assert_eq!(Letter::parse_labeled("B) Paris"), Some(Letter::B));
        assert_eq!(Letter::parse_labeled("c."), Some(Letter::C));
        assert_eq!(Letter::parse_labeled("a"), Some(Letter::A));
        assert_eq!(Letter::parse_labeled("Apple"), None);
    }

    #[test]
    fn option_text_drops_the_label() {
        let q = question("Which?", Letter::A);
        assert_eq!(q.option_text(Letter::C), "third");
        assert_eq!(strip_option_label("no label here"), "no label here");
        assert_eq!(strip_option_label("B.  spaced"), "spaced");
    }

    #[test]
    fn difficulty_is_case_insensitive() {
        assert_eq!(Difficulty::parse("Medium"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::parse(" HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("expert"), None);
    }
}
