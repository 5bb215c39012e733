pub mod extraction;
pub mod mutation;
pub mod plan;

pub use extraction::{ExtractionOutcome, ExtractionService};
pub use mutation::{
    ExecutionResult, FileModificationService, ModificationOutcome, ModificationState,
};
pub use plan::{CleanupPlan, FileModificationPlan, PlanOptions, RemovalOperation};
