//! The artifact store (content-keyed blob/table storage) and the
//! domain-event bus that lets out-of-scope collaborators observe
//! pipeline progress.

pub mod artifact;
pub mod events;
pub mod table;

pub use artifact::{
    report_key, tracking_key, ArtifactStore, InMemoryArtifactStore, ObjectStat, NAMESPACE_REPORTS,
    NAMESPACE_TRACKING,
};
pub use events::{DomainEvent, EventBus, InMemoryEventBus};
pub use table::{Table, TableRow};
