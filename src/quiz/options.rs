use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("a question needs at least {} options", MIN_OPTIONS)]
    TooFew,
    #[error("a question can have at most {} options", MAX_OPTIONS)]
    TooMany,
    #[error("option {0} does not exist")]
    OutOfRange(usize),
    #[error("option text must not be empty")]
    Blank,
}

/// Ordered answer options of a multiple-choice question together with the
/// index of the correct one.
///
/// Always holds between [`MIN_OPTIONS`] and [`MAX_OPTIONS`] options and a
/// correct index that points at one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawOptionSet")]
pub struct OptionSet {
    options: Vec<String>,
    correct_index: usize,
}

#[derive(Deserialize)]
struct RawOptionSet {
    options: Vec<String>,
    correct_index: usize,
}

impl TryFrom<RawOptionSet> for OptionSet {
    type Error = OptionError;

    fn try_from(raw: RawOptionSet) -> Result<Self, Self::Error> {
        OptionSet::new(raw.options, raw.correct_index)
    }
}

impl OptionSet {
    pub fn new(options: Vec<String>, correct_index: usize) -> Result<Self, OptionError> {
        if options.len() < MIN_OPTIONS {
            return Err(OptionError::TooFew);
        }
        if options.len() > MAX_OPTIONS {
            return Err(OptionError::TooMany);
        }
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err(OptionError::Blank);
        }
        if correct_index >= options.len() {
            return Err(OptionError::OutOfRange(correct_index));
        }
        Ok(Self {
            options,
            correct_index,
        })
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn add(&mut self, text: String) -> Result<(), OptionError> {
        if self.options.len() >= MAX_OPTIONS {
            return Err(OptionError::TooMany);
        }
        if text.trim().is_empty() {
            return Err(OptionError::Blank);
        }
        self.options.push(text);
        Ok(())
    }

    pub fn update(&mut self, index: usize, text: String) -> Result<(), OptionError> {
        if text.trim().is_empty() {
            return Err(OptionError::Blank);
        }
        let slot = self
            .options
            .get_mut(index)
            .ok_or(OptionError::OutOfRange(index))?;
        *slot = text;
        Ok(())
    }

    /// Removes the option at `index`.
    ///
    /// Options before the correct one shift it down by one. Removing the
    /// correct option itself leaves the index in place, so it then names the
    /// following option, or resets to 0 when nothing follows.
    pub fn remove(&mut self, index: usize) -> Result<String, OptionError> {
        if index >= self.options.len() {
            return Err(OptionError::OutOfRange(index));
        }
        if self.options.len() <= MIN_OPTIONS {
            return Err(OptionError::TooFew);
        }
        let removed = self.options.remove(index);
        if index < self.correct_index {
            self.correct_index -= 1;
        }
        if self.correct_index >= self.options.len() {
            self.correct_index = 0;
        }
        Ok(removed)
    }

    pub fn set_correct(&mut self, index: usize) -> Result<(), OptionError> {
        if index >= self.options.len() {
            return Err(OptionError::OutOfRange(index));
        }
        self.correct_index = index;
        Ok(())
    }

    /// Moves the option at `from` to position `to`; the correct index keeps
    /// following the same option.
    pub fn move_option(&mut self, from: usize, to: usize) -> Result<(), OptionError> {
        let len = self.options.len();
        if from >= len {
            return Err(OptionError::OutOfRange(from));
        }
        if to >= len {
            return Err(OptionError::OutOfRange(to));
        }
        let option = self.options.remove(from);
        self.options.insert(to, option);

        let correct = self.correct_index;
        self.correct_index = if correct == from {
            to
        } else if from < correct && correct <= to {
            correct - 1
        } else if to <= correct && correct < from {
            correct + 1
        } else {
            correct
        };
        Ok(())
    }
}
