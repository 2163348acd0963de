//! # photo-relink CLI
//!
//! Command-line interface for the catalog relinker.
//!
//! ## Usage
//! ```bash
//! photo-relink reconcile ~/Photos --db catalog.db
//! photo-relink rename --db catalog.db --format "{timestamp}.jpg" --dry-run
//! ```
//!
//! ## Exit codes
//! - 0: no changes needed
//! - 1: fatal error
//! - 2: changes applied
//! - 3: unresolved conflicts requiring attention

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}
