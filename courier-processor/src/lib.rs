//! Courier Processor
//!
//! Reliably turns transactional outbox rows into jobs on an execution
//! backend, with at-least-once delivery.
//!
//! Architecture:
//! - Configuration: tunables passed explicitly at construction
//! - Repositories: the outbox store and the execution backend, behind traits
//! - Services: the batch dispatcher (bounded fan-out, per-entry outcomes)
//! - Scheduler: the adaptive poll loop
//! - Processor: start/stop lifecycle around the poll loop
//!
//! # Example
//!
//! ```no_run
//! use courier_client::ExecutionClient;
//! use courier_core::dto::entry::NewOutboxEntry;
//! use courier_processor::repository::{HttpDispatchClient, InMemoryOutboxRepository};
//! use courier_processor::{OutboxProcessor, ProcessorConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let outbox = InMemoryOutboxRepository::new();
//!     outbox.enqueue(NewOutboxEntry::new(
//!         "process_documents",
//!         serde_json::json!({ "documents": [1, 2] }),
//!         "course-42",
//!     ));
//!
//!     // Finished entries are dropped after an hour
//!     let mut config = ProcessorConfig::new("processor-1");
//!     config.terminal_retention = Some(Duration::from_secs(3600));
//!
//!     let client = HttpDispatchClient::new(ExecutionClient::new("http://localhost:9090"));
//!     let processor = OutboxProcessor::new(
//!         config,
//!         Arc::new(outbox),
//!         Arc::new(client),
//!     );
//!
//!     processor.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     processor.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod processor;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::{Config, ProcessorConfig};
pub use error::{ProcessorError, StoreError, StoreResult};
pub use processor::OutboxProcessor;
pub use scheduler::PollBackoff;
pub use service::BatchReport;
