//! The `utils` module provides common definitions shared across the
//! application, such as the server-level error type.

pub mod error;

pub use error::ServerError;
