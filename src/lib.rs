//! Purpose: Read-only codec for Vector Product Format (VPF) tables and their index files.
//! Exports: `api` (stable surface), `core` (headers, rows, streams, errors).
//! Role: Library backing the `vpfio` CLI and any feature-model layer built on decoded rows.
//! Invariants: Streams own their file handles; decoded rows never borrow from a stream.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
