//! Model catalog port.
//!
//! Used once at startup to check which models the backend has pulled.

use async_trait::async_trait;
use std::fmt;

use super::backend::BackendError;

/// Port for listing the models available on the inference backend.
#[async_trait]
pub trait ModelCatalogPort: Send + Sync + fmt::Debug {
    /// Names of all models the backend can serve (e.g. `llama3.2:latest`).
    async fn list_model_names(&self) -> Result<Vec<String>, BackendError>;
}
