//! Core domain types.
//!
//! These types are independent of any transport. The proxy maps them onto
//! HTTP requests and responses.

mod form;
mod generation;

pub use form::{PrdForm, ValidationError};
pub use generation::{
    DEFAULT_TEMPERATURE, GenerationEvent, GenerationOptions, GenerationRequest,
};
