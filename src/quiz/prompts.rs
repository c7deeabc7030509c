use crate::quiz::Question;

/// How many questions of each difficulty to ask for. The remainder goes to the easier tiers first.
pub fn difficulty_split(count: usize) -> (usize, usize, usize) {
    let base = count / 3;
    let remainder = count % 3;
    let easy = base + usize::from(remainder > 0);
    let medium = base + usize::from(remainder > 1);
    (easy, medium, base)
}

pub fn question_generation_prompt(topic: &str, count: usize) -> String {
    let (easy, medium, hard) = difficulty_split(count);

    format!(
        r#"Generate {count} multiple choice questions about {topic}.
Spread them evenly across three difficulty levels:
- Easy ({easy} questions): basic concept understanding
- Medium ({medium} questions): application of concepts
- Hard ({hard} questions): analysis and advanced understanding

Order the questions from Easy to Medium to Hard.

Reply with a single JSON object and nothing else, in this format:
{{
    "questions": [
        {{
            "question": "The question text",
            "options": ["A) option1", "B) option2", "C) option3", "D) option4"],
            "correct_answer": "The correct option letter (A/B/C/D)",
            "explanation": "Brief explanation of the correct answer",
            "difficulty": "easy/medium/hard",
            "topic_area": "specific subtopic within {topic}"
        }}
    ]
}}

Guidelines for each difficulty:
- Easy: direct concept questions, straightforward application
- Medium: questions requiring understanding of relationships between concepts
- Hard: questions requiring analysis, evaluation, or multiple concept integration

Every question must:
1. Be clear and appropriate for a 10th grade student
2. Have exactly four options and one definitively correct answer
3. Have plausible distractors
4. Include a helpful explanation"#
    )
}

pub fn feedback_prompt(question: &Question, student_answer: &str) -> String {
    format!(
        r#"Question: {}
Student's answer: {}
Correct answer: {}

Provide a detailed evaluation including:
1. Whether the answer is correct
2. Explanation of why it's correct or incorrect
3. Key concepts the student should review if needed
4. Suggestions for improvement"#,
        question.text, student_answer, question.correct_answer
    )
}
