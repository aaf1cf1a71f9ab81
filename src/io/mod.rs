pub mod config_io;
pub mod lock;
pub mod memory_store;
pub mod snapshot_store;
pub mod store;
pub mod todoist;

pub use memory_store::MemoryStore;
pub use snapshot_store::SnapshotStore;
pub use store::{Change, ChangeQueue, DueUpdate, StoreError, TaskStore, TaskUpdate};
pub use todoist::TodoistStore;
