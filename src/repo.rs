mod contacts;
mod dynamo;
mod memory;

pub use contacts::{Contact, ContactStore, StoreError, StoreErrorKind, StoreResult};
pub use dynamo::DynamoContactStore;
pub use memory::InMemoryContactStore;
