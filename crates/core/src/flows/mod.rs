pub mod coordinator;
pub mod states;

pub use coordinator::RunCoordinator;
pub use states::{Outcome, RunReport, RunStep, RunSummary};
