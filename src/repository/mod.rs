//! Content repository access
//!
//! The pipeline watches a hierarchical content store through the
//! `ContentRepository` trait: it subscribes for change notifications,
//! resolves event paths to node identities, and reads node payloads.

mod event;
mod fs;
mod memory;
mod path;
mod traits;

pub use event::{EventKind, EventMask, RawEvent, SubscriptionFilter};
pub use fs::FsRepository;
pub use memory::{MemoryRepository, FILE_NODE_TYPE, RESOURCE_NODE_TYPE};
pub use path::NodePath;
pub use traits::{
    ChangeListener, ContentLayout, ContentRepository, NodeContent, RepositoryError,
    SubscriptionId,
};
