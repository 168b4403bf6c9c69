//! Courier Store
//!
//! PostgreSQL access for the outbox table: pool setup, migrations and the
//! row-level queries used by producers and the outbox processor.
//!
//! Atomicity of claims is delegated to the database (`FOR UPDATE SKIP
//! LOCKED`), so any number of processors can poll the same table.

pub mod db;
pub mod repository;

pub use repository::entry as entry_repository;
