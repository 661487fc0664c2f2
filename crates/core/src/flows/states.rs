use serde::{Deserialize, Serialize};

use crate::errors::QuoteErrorKind;

/// Stages of a single resolution pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Received,
    Normalized,
    Filtered,
    BucketSelected,
    Priced,
    CommitmentComputed,
    Completed,
    Rejected(QuoteErrorKind),
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected(_))
    }

    pub fn can_transition_to(&self, next: &ResolutionState) -> bool {
        use ResolutionState::{
            BucketSelected, CommitmentComputed, Completed, Filtered, Normalized, Priced, Received,
            Rejected,
        };

        matches!(
            (self, next),
            (Received, Normalized)
                | (Normalized, Filtered)
                | (Filtered, BucketSelected)
                | (BucketSelected, Priced)
                | (Priced, CommitmentComputed)
                | (CommitmentComputed, Completed)
        ) || (!self.is_terminal() && matches!(next, Rejected(_)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStep {
    pub state: ResolutionState,
    pub detail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionTrace {
    pub steps: Vec<ResolutionStep>,
}

impl ResolutionTrace {
    pub fn last_state(&self) -> Option<ResolutionState> {
        self.steps.last().map(|step| step.state)
    }
}
