//! # Vote Encoding
//!
//! Every vote is packed into one non-negative integer before it is pushed
//! onto a user's log.
//!
//! ## Layout `packed-v1`
//!
//! ```text
//!  63 .. 4   3 .. 0
//! [ target ][action]
//! ```
//!
//! - Low 4 bits: action code, 0 to 15
//! - Remaining bits: target id, capped at `2^59 - 1` so the entry stays a
//!   positive `i64` (Redis integers are signed)
//! - Stored as a decimal string
//!
//! The layout is recorded in the store under [`LAYOUT`]. Older logs written as
//! `target * 10 + action` are **not** readable with this decoder, there is no
//! migration path for them.
use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

pub const LAYOUT: &str = "packed-v1";

pub const ACTION_BITS: u32 = 4;
pub const ACTION_MASK: u64 = (1 << ACTION_BITS) - 1;
pub const MAX_ACTION: u64 = ACTION_MASK;
pub const MAX_TARGET: u64 = (1 << 59) - 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Action {0} does not fit in 4 bits")]
    ActionOutOfRange(u64),

    #[error("Target {0} is out of range")]
    TargetOutOfRange(u64),

    #[error("Malformed entry: {0:?}")]
    MalformedEntry(String),
}

/// One user action against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub action: u8,
    pub target: u64,
}

/// An [`Event`] packed into a single scalar, as stored in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry(u64);

impl Entry {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Entry {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Entry)
            .map_err(|_| CodecError::MalformedEntry(s.to_string()))
    }
}

pub fn encode(action: u64, target: u64) -> Result<Entry, CodecError> {
    if action & ACTION_MASK != action {
        return Err(CodecError::ActionOutOfRange(action));
    }

    if target > MAX_TARGET {
        return Err(CodecError::TargetOutOfRange(target));
    }

    Ok(Entry(target << ACTION_BITS | action))
}

pub fn decode(entry: Entry) -> Event {
    Event {
        action: (entry.0 & ACTION_MASK) as u8,
        target: entry.0 >> ACTION_BITS,
    }
}

impl Event {
    pub fn encode(&self) -> Result<Entry, CodecError> {
        encode(self.action as u64, self.target)
    }
}
