//! Navigation gate for protected routes.
//!
//! Before a protected view is entered the gate waits, bounded, for any
//! in-flight reconciliation to settle, runs one itself if no identity is
//! known, and then allows or redirects. It never waits indefinitely.

use std::sync::Arc;

use caretaker_core::config::NavigationConfig;
use caretaker_core::navigation::{NavigationDecision, RouteRequest};
use tokio::time::{Instant, sleep};

use crate::auth::Reconciler;

pub struct NavigationGate {
    reconciler: Arc<Reconciler>,
    config: NavigationConfig,
}

impl NavigationGate {
    pub fn new(reconciler: Arc<Reconciler>, config: NavigationConfig) -> Self {
        Self { reconciler, config }
    }

    /// Decides whether navigation to `request` may proceed.
    pub async fn guard(&self, request: &RouteRequest) -> NavigationDecision {
        let store = self.reconciler.store();

        if !request.meta.requires_auth {
            if request.meta.hide_for_auth && store.is_authenticated() {
                tracing::debug!(
                    "[NavigationGate] {} hidden for authenticated users",
                    request.full_path
                );
                return NavigationDecision::Redirect {
                    to: self.config.home_route.clone(),
                    return_to: None,
                };
            }
            return NavigationDecision::Allow;
        }

        let max_wait = self.config.max_wait(self.reconciler.platform());
        if !self.wait_until_settled(Instant::now() + max_wait).await {
            tracing::warn!(
                "[NavigationGate] Auth still loading after {:?}, forcing release",
                max_wait
            );
            self.reconciler.release_loading();
        }

        if !store.has_identity() {
            self.reconciler.reconcile().await;
        }

        if store.is_authenticated() {
            NavigationDecision::Allow
        } else {
            tracing::info!(
                "[NavigationGate] Not authenticated, redirecting {} to {}",
                request.full_path,
                self.config.sign_in_route
            );
            NavigationDecision::Redirect {
                to: self.config.sign_in_route.clone(),
                return_to: Some(request.full_path.clone()),
            }
        }
    }

    /// Polls the loading flag until it clears or `deadline` passes.
    ///
    /// Returns `true` if loading cleared in time.
    pub async fn wait_until_settled(&self, deadline: Instant) -> bool {
        let store = self.reconciler.store();
        let poll = self.config.poll_interval();

        loop {
            if !store.is_loading() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(poll.min(deadline - now)).await;
        }
    }
}
