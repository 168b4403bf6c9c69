//! Courier Core
//!
//! Core types shared by the Courier outbox services.
//!
//! This crate contains:
//! - Domain types: outbox entries, their lifecycle status and dispatch outcomes
//! - DTOs: data transfer objects for producers and the execution backend

pub mod domain;
pub mod dto;
