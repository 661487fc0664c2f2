use crate::errors::QuoteError;
use crate::flows::states::{ResolutionState, ResolutionStep, ResolutionTrace};

/// Tracks one pass through the resolution state machine and records every
/// transition with a human-readable detail.
#[derive(Clone, Debug)]
pub struct ResolutionFlow {
    current: ResolutionState,
    trace: ResolutionTrace,
}

impl ResolutionFlow {
    pub fn start(detail: impl Into<String>) -> Self {
        Self {
            current: ResolutionState::Received,
            trace: ResolutionTrace {
                steps: vec![ResolutionStep {
                    state: ResolutionState::Received,
                    detail: detail.into(),
                }],
            },
        }
    }

    pub fn current(&self) -> ResolutionState {
        self.current
    }

    /// Callers drive a fixed sequence; an illegal edge is a programming error.
    pub fn advance(&mut self, next: ResolutionState, detail: impl Into<String>) {
        debug_assert!(
            self.current.can_transition_to(&next),
            "illegal resolution transition {:?} -> {:?}",
            self.current,
            next
        );
        self.current = next;
        self.trace.steps.push(ResolutionStep { state: next, detail: detail.into() });
    }

    pub fn reject(&mut self, error: &QuoteError) {
        self.advance(ResolutionState::Rejected(error.kind()), error.to_string());
    }

    pub fn trace(&self) -> &ResolutionTrace {
        &self.trace
    }

    pub fn into_trace(self) -> ResolutionTrace {
        self.trace
    }
}
