//! Route metadata consumed by the navigation gate.

use serde::{Deserialize, Serialize};

/// Access flags attached to a route definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Routes such as sign-in that make no sense once authenticated.
    pub hide_for_auth: bool,
}

impl RouteMeta {
    pub fn protected() -> Self {
        Self {
            requires_auth: true,
            hide_for_auth: false,
        }
    }

    pub fn public() -> Self {
        Self::default()
    }

    pub fn guest_only() -> Self {
        Self {
            requires_auth: false,
            hide_for_auth: true,
        }
    }
}

/// A navigation about to happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    /// Path including query and hash, used as the return target.
    pub full_path: String,
    pub meta: RouteMeta,
}

impl RouteRequest {
    pub fn new(full_path: impl Into<String>, meta: RouteMeta) -> Self {
        Self {
            full_path: full_path.into(),
            meta,
        }
    }
}

/// Outcome of the navigation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow,
    Redirect {
        to: String,
        /// Originally requested path, to resume after sign-in.
        return_to: Option<String>,
    },
}
