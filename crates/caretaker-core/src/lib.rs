//! Domain layer for the Caretaker client.
//!
//! Holds the session model and store, the ports the client needs from the
//! hosted backend, configuration, and the shared error type. Nothing here
//! performs I/O.

pub mod auth;
pub mod config;
pub mod error;
pub mod navigation;
pub mod session;
pub mod user;

// Re-export common error type
pub use error::CaretakerError;
