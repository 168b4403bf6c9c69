//! Repository layer
//!
//! Adapters at the two edges of the processor: the outbox store it claims
//! rows from, and the execution backend it dispatches jobs to. Both are
//! trait-based so the processor can run against Postgres and HTTP in
//! production and against in-memory fakes in tests.

mod dispatch;
mod memory;
mod outbox;
mod postgres;

// Re-export traits
pub use dispatch::DispatchClient;
pub use outbox::OutboxRepository;

// Re-export implementations
pub use dispatch::HttpDispatchClient;
pub use memory::InMemoryOutboxRepository;
pub use postgres::PgOutboxRepository;
