//! Enrichment engines
//!
//! The pipeline treats enrichment as an opaque call: a content item goes
//! in, a metadata graph comes out.

mod command;
mod mock;
mod traits;

pub use command::CommandEngine;
pub use mock::{MockEngine, MOCK_LENGTH, MOCK_MIME_TYPE};
pub use traits::{ContentItem, EngineError, EnhancementEngine};
