//! # scramble-context
//!
//! Picks which stored contexts accompany a new message.
//!
//! - [`ContextManager::select_contexts`] scores candidates and fills a token budget
//! - [`ContextManager::find_contexts_by_timeframe`] resolves "yesterday",
//!   "3 days ago" and similar references against record creation times
//! - [`ContextManager::process_message`] assembles candidates from temporal,
//!   semantic, and recent matches before selecting
//! - [`ContextManager::record_exchange`] compresses an exchange and stores it as
//!   the next link in the current conversation chain

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod selector;
pub mod temporal;
pub mod types;

pub use errors::{ContextError, Result};
pub use manager::ContextManager;
pub use selector::{dedupe_by_id, select};
pub use temporal::{TimeReference, parse_time_reference};
pub use types::{SelectedContext, SelectionReason};
