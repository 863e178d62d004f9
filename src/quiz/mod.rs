pub mod feedback;
pub mod grading;
pub mod options;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use options::OptionSet;

/// What a question asks for and how it is marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        #[serde(flatten)]
        options: OptionSet,
    },
    FillInBlank {
        correct_text: String,
    },
}

/// A question as shown to someone taking the quiz: answers stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptKind {
    MultipleChoice { options: Vec<String> },
    FillInBlank,
}

impl QuestionKind {
    pub fn redacted(&self) -> PromptKind {
        match self {
            QuestionKind::MultipleChoice { options } => PromptKind::MultipleChoice {
                options: options.options().to_vec(),
            },
            QuestionKind::FillInBlank { .. } => PromptKind::FillInBlank,
        }
    }

    pub fn option_set(&self) -> Option<&OptionSet> {
        match self {
            QuestionKind::MultipleChoice { options } => Some(options),
            QuestionKind::FillInBlank { .. } => None,
        }
    }

    pub fn option_set_mut(&mut self) -> Option<&mut OptionSet> {
        match self {
            QuestionKind::MultipleChoice { options } => Some(options),
            QuestionKind::FillInBlank { .. } => None,
        }
    }
}

/// A student's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Choice(usize),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Answer {
    pub question_id: i64,
    pub answer: AnswerValue,
}
