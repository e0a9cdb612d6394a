//! Storage of service metadata.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::PersistenceError;
pub use memory::InMemoryServiceRepository;
pub use traits::ServiceRepository;
