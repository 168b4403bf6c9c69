//! Scheduler layer for the processor
//!
//! This layer decides when to poll the outbox next and runs the poll loop:
//! claim a batch, hand it to the dispatcher, adapt the delay.

pub mod backoff;
pub mod poller;

pub use backoff::PollBackoff;
pub use poller::OutboxPoller;
