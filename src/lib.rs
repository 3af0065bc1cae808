//! Purpose: Library crate behind the `pushgate` binary and tests.
//! Exports: `api` (envelope parsing, criteria extraction, errors).
//! Role: Inbound message-envelope parsing core for a push dispatch gateway.
//! Invariants: Parsing is pure; no I/O happens below the `api` boundary.
pub mod api;
mod core;
