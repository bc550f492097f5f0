mod error;
mod memory;
mod redb_store;
mod state;
mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redb_store::RedbStore;
pub use state::AuditEvent;
pub use store::DeclarativeStore;
