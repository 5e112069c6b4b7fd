pub mod components;
pub mod cycles;
pub mod schedule_dag;

pub use cycles::CycleDetector;
pub use schedule_dag::{DependencyEdge, DependencyGraph};
