//! Adapters for the Caretaker client core: configuration files, the hosted
//! backend over HTTP, and page-lifecycle signals.

pub mod config_service;
pub mod lifecycle;
pub mod paths;
pub mod rest_backend;

pub use config_service::ConfigService;
pub use lifecycle::LifecycleHub;
pub use paths::{CaretakerPaths, PathError};
pub use rest_backend::RestBackend;
