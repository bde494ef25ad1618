use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PollError, PollResult};

pub type ConnectionId = uuid::Uuid;
pub type StudentId = String;

pub const POLL_CODE_LENGTH: usize = 6;

/// Short human-typed code addressing a poll.
///
/// A code is exactly six ASCII letters or digits, stored upper-cased. Parsing
/// trims and upper-cases the input, so `" ab12cd"` and `"AB12CD"` are the same
/// code, and anything else is refused. A `PollCode` is safe to use as a lock
/// key and as a file name.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PollCode(String);

impl PollCode {
    pub fn parse(code: &str) -> PollResult<Self> {
        let normalized = code.trim().to_ascii_uppercase();
        let well_formed = normalized.len() == POLL_CODE_LENGTH
            && normalized
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase());
        if well_formed {
            Ok(Self(normalized))
        } else {
            Err(PollError::InvalidPollCode(code.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PollCode {
    type Err = PollError;

    fn from_str(code: &str) -> PollResult<Self> {
        Self::parse(code)
    }
}

impl TryFrom<String> for PollCode {
    type Error = PollError;

    fn try_from(code: String) -> PollResult<Self> {
        Self::parse(&code)
    }
}

impl From<PollCode> for String {
    fn from(code: PollCode) -> Self {
        code.0
    }
}

impl fmt::Display for PollCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}
