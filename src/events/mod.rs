//! # Events Module
//!
//! Event-driven progress reporting for the reconciliation engine.
//!
//! ## Design
//! The core library emits events through channels, allowing any frontend
//! (CLI, GUI, tests) to subscribe and display progress without the core
//! knowing how it is rendered.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
