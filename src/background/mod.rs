//! Background processing of queued jobs.
//!
//! - `queue`: bounded FIFO shared with request handlers
//! - `worker`: the dedicated thread draining the queue
//! - `flows`: running one job through the hooks of its category

pub mod flows;
pub mod queue;
pub mod worker;
