pub mod engine;
pub mod states;

pub use engine::ResolutionFlow;
pub use states::{ResolutionState, ResolutionStep, ResolutionTrace};
