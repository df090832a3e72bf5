//! refload: bulk loader for bibliographic reference associations
//!
//! Validates tab-delimited association records against a curation store,
//! rejects duplicates, allocates dense association keys, and emits a
//! pipe-delimited bulk-load file for high-throughput import.

pub mod cli;
pub mod core;
