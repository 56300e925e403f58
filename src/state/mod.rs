pub mod await_index;
pub mod pending_store;
pub mod registry;

pub use await_index::{
    create_shared_await_index, spawn_sweeper, AwaitEntry, Resolution, SharedAwaitIndex,
};
pub use pending_store::{JsonPendingStore, PendingStore, SharedPendingStore};
pub use registry::{create_shared_registry, PendingActionRegistry, SharedRegistry};
