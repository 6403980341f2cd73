//! Dock detection
//!
//! - [`state`]: pure snapshot classification
//! - [`dispatcher`]: side effects for a transition
//! - [`poll`]: the loop tying enumerator, classifier and dispatcher together

pub mod dispatcher;
pub mod poll;
pub mod state;

pub use dispatcher::{ActionDispatcher, ActionStep, DispatchResult, StepOutcome};
pub use poll::{DockMonitor, PollTimings, TickOutcome};
pub use state::{DockConfiguration, DockState, Evaluation, Transition, evaluate};
