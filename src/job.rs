use std::num::IntErrorKind;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("empty job message")]
    Empty,
    #[error("negative index {0:?}")]
    Negative(String),
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("index {index} exceeds the maximum of {max}")]
    OutOfRange { index: String, max: u64 },
}

/// What the worker does with a message that does not parse to an index.
/// Indexes above the configured maximum are always rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidJobPolicy {
    /// Compute index 0 and store it under the raw message.
    #[default]
    Zero,
    /// Log and write nothing.
    Skip,
}

/// A request to compute one Fibonacci value. `key` is the message exactly as
/// received and becomes the hash field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: String,
    pub index: u64,
}

impl Job {
    pub fn parse(message: &str, max_index: u64) -> Result<Self, JobError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(JobError::Empty);
        }

        let index = match trimmed.parse::<u64>() {
            Ok(index) => index,
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
                return Err(JobError::OutOfRange {
                    index: trimmed.to_string(),
                    max: max_index,
                });
            }
            Err(_) => {
                return Err(if is_negative_integer(trimmed) {
                    JobError::Negative(trimmed.to_string())
                } else {
                    JobError::NotANumber(trimmed.to_string())
                });
            }
        };

        if index > max_index {
            return Err(JobError::OutOfRange {
                index: index.to_string(),
                max: max_index,
            });
        }

        Ok(Self {
            key: message.to_string(),
            index,
        })
    }

    pub fn degenerate(message: &str) -> Self {
        Self {
            key: message.to_string(),
            index: 0,
        }
    }
}

fn is_negative_integer(s: &str) -> bool {
    match s.strip_prefix('-') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
