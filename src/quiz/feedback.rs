use std::future::Future;

use thiserror::Error;

pub const FEEDBACK_REQUIRED: &str = "Please enter feedback before saving";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
}

#[derive(Debug, Error)]
pub enum FeedbackError<E> {
    #[error("{}", FEEDBACK_REQUIRED)]
    Empty,
    #[error("failed to save feedback")]
    Save(E),
}

/// Grader feedback being written for a submission.
///
/// Blank text is refused locally and never reaches the save callback.
#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    text: String,
    error: Option<&'static str>,
    state: SaveState,
}

impl FeedbackDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
            state: SaveState::Idle,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.error = None;
    }

    pub async fn submit<F, Fut, E>(&mut self, save: F) -> Result<(), FeedbackError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let text = self.text.trim();
        if text.is_empty() {
            self.error = Some(FEEDBACK_REQUIRED);
            return Err(FeedbackError::Empty);
        }
        let text = text.to_owned();

        self.state = SaveState::Saving;
        let result = save(text).await;
        self.state = SaveState::Idle;
        result.map_err(FeedbackError::Save)
    }
}
