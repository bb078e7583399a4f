//! Event listener: maps provider notifications and page-lifecycle signals to
//! reconciler calls.
//!
//! The mapping is the fixed [`EventPolicy`]; a policy under which a read of
//! the provider could re-trigger a read is rejected before subscribing.

use std::sync::Arc;

use caretaker_core::auth::{
    AuthEventKind, EventAction, EventPolicy, IdentityProvider, LifecycleSignal, LifecycleSource,
};
use caretaker_core::error::Result;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::reconciler::Reconciler;

/// Teardown handle returned by [`AuthEventListener::start`].
///
/// Dropping the handle also stops the listener.
pub struct ListenerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stops listening and waits for the listener task to exit.
    ///
    /// Reconciliations already spawned are allowed to finish.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .task
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct AuthEventListener {
    reconciler: Arc<Reconciler>,
    policy: EventPolicy,
}

impl AuthEventListener {
    pub fn new(reconciler: Arc<Reconciler>, policy: EventPolicy) -> Self {
        Self { reconciler, policy }
    }

    pub fn policy(&self) -> &EventPolicy {
        &self.policy
    }

    /// Subscribes to `provider` events and, if given, `lifecycle` signals.
    ///
    /// Fails with a config error if the policy would reconcile on an event
    /// the provider emits while being read.
    pub fn start(
        self: &Arc<Self>,
        provider: &dyn IdentityProvider,
        lifecycle: Option<&dyn LifecycleSource>,
    ) -> Result<ListenerHandle> {
        self.policy.validate(&provider.side_effect_events())?;

        let auth_events = provider.subscribe();
        let signals = lifecycle.map(|source| source.subscribe());
        let cancel = CancellationToken::new();

        let listener = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            listener.run(auth_events, signals, token).await;
        });

        tracing::info!(
            "[AuthEventListener] Listening (reconcile on: {:?}, lifecycle: {})",
            self.policy.reconciling_kinds(),
            lifecycle.is_some()
        );

        Ok(ListenerHandle {
            cancel,
            task: Some(task),
        })
    }

    async fn run(
        &self,
        mut auth_events: broadcast::Receiver<AuthEventKind>,
        mut signals: Option<broadcast::Receiver<LifecycleSignal>>,
        cancel: CancellationToken,
    ) {
        let mut auth_open = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = auth_events.recv(), if auth_open => match event {
                    Ok(kind) => self.on_auth_event(kind),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(
                            "[AuthEventListener] Missed {} auth events, resynchronizing",
                            missed
                        );
                        self.schedule_reconcile("lagged");
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("[AuthEventListener] Auth event stream closed");
                        auth_open = false;
                    }
                },
                signal = recv_signal(&mut signals) => match signal {
                    Ok(signal) => self.on_lifecycle_signal(signal),
                    Err(RecvError::Lagged(_)) => self.on_lifecycle_signal(LifecycleSignal::VisibleAgain),
                    Err(RecvError::Closed) => {
                        tracing::debug!("[AuthEventListener] Lifecycle stream closed");
                        signals = None;
                    }
                },
            }

            if !auth_open && signals.is_none() {
                break;
            }
        }

        tracing::debug!("[AuthEventListener] Stopped");
    }

    fn on_auth_event(&self, kind: AuthEventKind) {
        match self.policy.action_for(kind) {
            EventAction::Reconcile => self.schedule_reconcile(&kind.to_string()),
            EventAction::Clear => {
                tracing::info!("[AuthEventListener] {} received, clearing session", kind);
                self.reconciler.clear();
            }
            EventAction::Ignore => {
                tracing::debug!("[AuthEventListener] Ignoring {}", kind);
            }
        }
    }

    fn on_lifecycle_signal(&self, signal: LifecycleSignal) {
        if self.reconciler.store().has_identity() {
            self.schedule_reconcile(&signal.to_string());
        } else {
            tracing::debug!(
                "[AuthEventListener] Ignoring {}: no identity known",
                signal
            );
        }
    }

    /// Spawns a reconciliation so a slow attempt never delays a sign-out
    /// arriving behind it. The debounce guard drops bursts.
    fn schedule_reconcile(&self, trigger: &str) {
        tracing::debug!("[AuthEventListener] Scheduling reconcile ({})", trigger);
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            reconciler.reconcile().await;
        });
    }
}

async fn recv_signal(
    signals: &mut Option<broadcast::Receiver<LifecycleSignal>>,
) -> std::result::Result<LifecycleSignal, RecvError> {
    match signals {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
