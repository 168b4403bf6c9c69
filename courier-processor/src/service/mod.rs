//! Service layer
//!
//! Business logic of the processor: driving a claimed batch to completion.

mod dispatcher;

pub use dispatcher::{BatchDispatcher, BatchReport};
