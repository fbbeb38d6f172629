//! Per-member clock-in/clock-out timekeeping for cards, without a server of its own.
//! State lives in a scoped key-value store owned by the host, and completed sessions are
//! announced on the card's activity stream.
//!

pub mod cli;
pub mod engine;
pub mod identity;
pub mod notify;
pub mod store;
pub mod utils;
