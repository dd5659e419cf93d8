/// Run state definitions
///
/// A run moves strictly forward: `Idle -> Running -> Completed`.
use std::fmt;

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Run has been created but no source has been scheduled
    Idle,

    /// Sources are being crawled
    Running,

    /// Result has been finalized; nothing may be recorded anymore
    Completed,
}

impl RunState {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running) | (Self::Running, Self::Completed)
        )
    }

    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![Self::Idle, Self::Running, Self::Completed]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
