//! Step orchestration for listing and offer flows.
//!
//! The pure parts ([`guard`], [`invalidation`], [`state`]) decide what each
//! step may do. [`Flow`] holds the inputs and drives the external
//! collaborators.

mod form;
pub mod guard;
pub mod invalidation;
mod orchestrator;
pub mod state;
mod step;

pub use form::OrderForm;
pub use guard::{GuardCheck, GuardInput, GuardResult, SuggestedAction};
pub use invalidation::{ApprovalDependencySnapshot, ApprovalTracker, InvalidationEvent};
pub use orchestrator::{Flow, FlowBuilder, StepOutcome};
pub use state::{FlowSnapshot, FlowState, recompute};
pub use step::{ExecutionState, StepDescriptor, StepId, StepStatus};
