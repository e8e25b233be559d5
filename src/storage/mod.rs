//! Storage backends for derived metadata
//!
//! The pipeline writes through the `MetadataStore` trait. `MemoryStore`
//! serves embedding hosts and tests; `SqliteStore` persists statements.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{MetadataStore, OpenStore, StoreError, StoreResult};
pub(crate) use traits::validate;
