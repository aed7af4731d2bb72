pub mod queue;
pub mod system;
pub mod workflow;
