/// Lifecycle states of a crawl task
///
/// `Pending -> Admitted -> Claimed -> Fetching -> {Persisted | Failed}`
use std::fmt;

/// Represents the current state of a task in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Created from a seed or an extracted link, not yet checked
    Pending,

    /// Passed the Scope Filter and the depth budget
    Admitted,

    /// Won the Dedup Index claim; queued in the Frontier
    Claimed,

    /// Handed to a worker and being rendered
    Fetching,

    // ===== Terminal States =====
    /// Fetched and its artifact written
    Persisted,

    /// Fetch or storage failed; never retried within the run
    Failed,
}

impl TaskState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }

    /// Returns true if the transition follows the task lifecycle
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Admitted)
                | (Self::Admitted, Self::Claimed)
                | (Self::Claimed, Self::Fetching)
                | (Self::Fetching, Self::Persisted)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Admitted => "admitted",
            Self::Claimed => "claimed",
            Self::Fetching => "fetching",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
