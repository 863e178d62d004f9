use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::{Answer, AnswerValue, QuestionKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradingError {
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(i64),
    #[error("question {0} was answered more than once")]
    DuplicateAnswer(i64),
    #[error("submission contains no answers")]
    NoAnswers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: i64,
    pub total: i64,
}

pub fn is_correct(kind: &QuestionKind, answer: &AnswerValue) -> bool {
    match (kind, answer) {
        (QuestionKind::MultipleChoice { options }, AnswerValue::Choice(index)) => {
            *index == options.correct_index()
        }
        (QuestionKind::FillInBlank { correct_text }, AnswerValue::Text(text)) => {
            normalize(text) == normalize(correct_text)
        }
        _ => false,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Marks `answers` against the answer key. Every question in the key counts
/// toward the total, answered or not.
pub fn grade(key: &HashMap<i64, QuestionKind>, answers: &[Answer]) -> Result<Score, GradingError> {
    if answers.is_empty() {
        return Err(GradingError::NoAnswers);
    }
    let mut seen = HashSet::with_capacity(answers.len());
    let mut correct = 0;
    for answer in answers {
        let kind = key
            .get(&answer.question_id)
            .ok_or(GradingError::UnknownQuestion(answer.question_id))?;
        if !seen.insert(answer.question_id) {
            return Err(GradingError::DuplicateAnswer(answer.question_id));
        }
        if is_correct(kind, &answer.answer) {
            correct += 1;
        }
    }
    Ok(Score {
        correct,
        total: key.len() as i64,
    })
}
