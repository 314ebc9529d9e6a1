//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from
//! infrastructure. They contain no HTTP details and use only domain types.

pub mod backend;
pub mod model_catalog;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{BackendError, BackendStreamPort, ByteStream};
pub use model_catalog::ModelCatalogPort;
