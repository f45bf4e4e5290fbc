//! Catalog use-case operations.
//!
//! # Responsibility
//! - Orchestrate several DAOs into single atomic operations.
//! - Keep sync and UI callers decoupled from table layout.

pub mod maintenance;
