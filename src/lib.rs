//! # Photo Relink
//!
//! Reconnects a photo catalog with files that were moved, renamed, or
//! duplicated on disk.
//!
//! ## Core Philosophy
//! - **Never lose a file** - filesystem changes commit before database changes
//! - **Never guess silently** - ambiguous matches are reported, not forced
//! - **Leave a trail** - every applied path change lands in the audit log
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - scanning, matching, rename planning, and transactional moves
//! - `events` - event-driven progress reporting
//! - `error` - error types with path context
//! - `cli` - command-line interface

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{RelinkError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
