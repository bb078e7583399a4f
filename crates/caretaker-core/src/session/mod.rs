//! Client-side session state.
//!
//! `Session` is the believed identity of the current user; `SessionStore`
//! owns it and is the only place it is mutated.

mod model;
mod store;

pub use model::Session;
pub use store::{AttemptId, Commit, SessionStore, SkipReason};
