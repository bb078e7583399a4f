//! User domain module.
//!
//! # Module Structure
//!
//! - `model`: remote identity handle and local profile record
//! - `repository`: profile storage port
//!
//! # Usage
//!
//! ```ignore
//! use caretaker_core::user::{Identity, Profile, ProfileRepository, Role};
//! ```

mod model;
mod repository;

// Re-export public API
pub use model::{Identity, NewProfile, Profile, Role};
pub use repository::ProfileRepository;
