//! Core data model.
//!
//! A priority is one of four discrete levels. Higher levels always dequeue
//! before lower ones; within a level, arrival order wins.

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Dequeue precedence of an item. `Critical` is the highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Every level, lowest first.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Critical,
    ];

    /// Number of distinct levels.
    pub const COUNT: usize = Self::ALL.len();

    /// Slot of this level in a per-level table (Low = 0 .. Critical = 3).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw integer levels, as used by callers that carry priorities on the wire.
/// Anything outside `0..=3` is rejected rather than clamped.
impl TryFrom<i32> for Priority {
    type Error = Error;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Normal),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Critical),
            other => Err(Error::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for i32 {
    fn from(p: Priority) -> Self {
        p as i32
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::UnknownPriority(s.to_string())),
        }
    }
}
