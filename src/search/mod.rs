//! Search Module
//!
//! Lexical lookup over stored files. The client feeds the text of every
//! uploaded file in and drops it again on delete; queries return filenames
//! ranked by how many distinct query terms they contain.
//!
//! ## Submodules
//! - **`tokenizer`**: normalization of document text and queries.
//! - **`index`**: the `DocumentIndex` seam and its JSON-backed `TermIndex`.

pub mod index;
pub mod tokenizer;
