#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod prompt;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    GenerationEvent, GenerationOptions, GenerationRequest, PrdForm, ValidationError,
};
pub use ports::{BackendError, BackendStreamPort, ByteStream, ModelCatalogPort};
pub use settings::{
    DEFAULT_BACKEND_TIMEOUT, DEFAULT_FALLBACK_MODEL, DEFAULT_GENERATE_URL, DEFAULT_PORT,
    DEFAULT_PREFERRED_MODEL, ModelPreference, ModelSelection, ModelSource,
};
