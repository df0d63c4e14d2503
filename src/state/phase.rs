//! Pipeline phase definitions for the scrape coordinator
//!
//! The coordinator cycles `Paging -> Dispatching -> Persisting -> Paging`
//! until the listing is exhausted, the record cap is hit or paging aborts,
//! then leaves through `Draining -> Done`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    /// Fetching the next listing page
    Paging,

    /// Submitting detail fetches for the current page
    Dispatching,

    /// Upserting completed detail fetches
    Persisting,

    /// Waiting for every in-flight fetch and persisting the rest
    Draining,

    /// Run finished; statistics are final
    Done,
}

impl PipelinePhase {
    /// Returns true if the phase can be left for `next`
    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        matches!(
            (self, next),
            (Self::Paging, Self::Dispatching)
                | (Self::Paging, Self::Draining)
                | (Self::Dispatching, Self::Persisting)
                | (Self::Persisting, Self::Paging)
                | (Self::Persisting, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paging => "paging",
            Self::Dispatching => "dispatching",
            Self::Persisting => "persisting",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
