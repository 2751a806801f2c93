pub mod mover;

pub use mover::{
    tree_stats, ModelMover, ModelOutcome, ModelStatus, NoopObserver, PlannedModel,
    RelocationObserver, RelocationPlan, RelocationProgress, RelocationReport,
};
