//! Authentication ports and event vocabulary.
//!
//! The identity provider and page-lifecycle source are external
//! collaborators; this module only fixes the interface the client core needs
//! from them, plus the policy deciding which of their events may trigger a
//! reconciliation.

mod event;
mod platform;
mod provider;

pub use event::{AuthEventKind, EventAction, EventPolicy, LifecycleSignal};
pub use platform::Platform;
pub use provider::{IdentityProvider, LifecycleSource};
