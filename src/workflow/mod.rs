pub mod controller;
pub mod events;
pub mod guard;
pub mod state;

pub use controller::{LoadReport, ModuleView, RunOutcome, WorkflowController};
pub use events::{ActionKind, ResourceKind, WorkflowEvent};
pub use guard::{InFlightRuns, RunGuard};
pub use state::{PendingRun, Resource, ResourceError, WorkflowState};
