/// Category state definitions for tracking batch progress
///
/// Every category moves through `Pending -> InProgress` and then lands in
/// exactly one terminal outcome.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a category in a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryState {
    // ===== Active States =====
    /// Category is selected for this run but has not started
    Pending,

    /// Category is being searched, learned and extracted
    InProgress,

    // ===== Terminal States =====
    /// At least one extraction rule cleared the confidence threshold
    Learned,

    /// Pages were fetched but no rule survived learning
    NoPatterns,

    /// Search or fetching failed, nothing could be learned
    Failed,
}

impl CategoryState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Learned | Self::NoPatterns | Self::Failed)
    }

    /// Returns true if this outcome counts towards the success rate
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Learned)
    }

    /// Checks whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: CategoryState) -> bool {
        match self {
            Self::Pending => next == Self::InProgress,
            Self::InProgress => next.is_terminal(),
            Self::Learned | Self::NoPatterns | Self::Failed => false,
        }
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    ///
    /// # Returns
    ///
    /// * `Ok(CategoryState)` - The new state
    /// * `Err(MinerError::InvalidTransition)` - The transition is not allowed
    pub fn transition(self, next: CategoryState) -> crate::Result<CategoryState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::MinerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Converts the state to its string representation in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Learned => "learned",
            Self::NoPatterns => "no_patterns",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "learned" => Some(Self::Learned),
            "no_patterns" => Some(Self::NoPatterns),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible category states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InProgress,
            Self::Learned,
            Self::NoPatterns,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CategoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
