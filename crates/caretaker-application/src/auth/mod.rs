//! Auth-state reconciliation.
//!
//! - `reconciler`: fetches remote identity and profile, commits a consistent
//!   pair or clears both
//! - `listener`: maps provider events and page-lifecycle signals to
//!   reconciler calls

mod listener;
mod reconciler;

#[cfg(test)]
pub(crate) mod test_support;

pub use listener::{AuthEventListener, ListenerHandle};
pub use reconciler::{ReconcileOutcome, Reconciler, PROFILE_NOT_FOUND};
