//! Core use-case services.
//!
//! # Responsibility
//! - Bundle store and pool into save/load entry points for callers.
//! - Keep callers decoupled from task and backend wiring.

pub mod graph_service;
