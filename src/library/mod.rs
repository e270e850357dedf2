//! Storage for normalized content documents.
//!
//! The normalizer reads existing documents through [`ContentStore`]; the CLI
//! and callers write through it.

pub mod file_store;
pub mod store;

pub use file_store::FileContentStore;
pub use store::{ContentStore, MemoryContentStore};
