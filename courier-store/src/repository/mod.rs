//! Repository Module
//!
//! Data access layer for the outbox table.

pub mod entry;
