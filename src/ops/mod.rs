pub mod activation;
pub mod last_run;
pub mod run;
pub mod tree;

pub use activation::{Engine, Evaluation, NodeFacts, PlanNode, ProcessingMode, Verdict, evaluate};
pub use run::{RunContext, RunError, RunReport, Settings, Updater};
pub use tree::{Children, TreeIndex};
