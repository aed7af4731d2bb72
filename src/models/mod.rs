pub mod category;
pub mod job;
pub mod status;
pub mod workflow;
