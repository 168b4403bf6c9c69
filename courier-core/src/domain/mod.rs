//! Core domain types
//!
//! These types are shared between the store (which persists them) and the
//! processor (which drives them through their lifecycle).

pub mod entry;
pub mod outcome;
pub mod retry;
