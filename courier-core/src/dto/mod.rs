//! Data Transfer Objects
//!
//! Lightweight shapes used at the edges of the system: producers writing new
//! outbox rows, and the processor talking to the execution backend.

pub mod entry;
pub mod submit;
