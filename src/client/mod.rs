//! Client Module
//!
//! File-level operations on top of the chunk tiers.
//!
//! ## Workspace
//! Everything the client keeps locally lives under one directory:
//! - `metadata/`: one `<filename>.json` placement document per stored file.
//! - `chunks/`: chunk bytes cached by downloads.
//! - `downloaded_files/`: reassembled files.
//! - `index/`: the search index.
//!
//! ## Operations
//! - **upload**: split, place every chunk through the global balancer, then
//!   record placement. Nothing is recorded unless every chunk was stored.
//! - **download**: fetch chunks from their recorded nodes and reassemble.
//! - **delete**: remove chunks from their nodes; only a fully confirmed delete
//!   removes the metadata and local copies.

pub mod chunker;
pub mod client;
pub mod delete;
pub mod download;
pub mod upload;

#[cfg(test)]
mod tests;
