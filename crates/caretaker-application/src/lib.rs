//! Application layer for Caretaker.
//!
//! Use cases that keep the client's belief about "who is signed in"
//! consistent with the remote session: reconciliation, event handling, and
//! the navigation gate that protected views wait on.

pub mod auth;
pub mod auth_usecase;
pub mod navigation_gate;

pub use auth::{AuthEventListener, ListenerHandle, ReconcileOutcome, Reconciler};
pub use auth_usecase::AuthUseCase;
pub use navigation_gate::NavigationGate;
