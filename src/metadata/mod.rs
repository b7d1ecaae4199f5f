//! File Metadata Module
//!
//! Persists, per stored file, which node holds each of its chunks. Documents
//! are plain JSON objects keyed by chunk id so they stay readable by hand.

pub mod store;
pub mod types;
