//! Broadcaster for page-lifecycle signals.

use caretaker_core::auth::{LifecycleSignal, LifecycleSource};
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

/// Fan-out point the shell feeds visibility, cache-restore and focus
/// notifications into.
#[derive(Debug, Clone)]
pub struct LifecycleHub {
    signals: broadcast::Sender<LifecycleSignal>,
}

impl Default for LifecycleHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleHub {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { signals }
    }

    /// Publishes `signal`; returns how many subscribers received it.
    pub fn emit(&self, signal: LifecycleSignal) -> usize {
        tracing::debug!("[LifecycleHub] {:?}", signal);
        self.signals.send(signal).unwrap_or(0)
    }
}

impl LifecycleSource for LifecycleHub {
    fn subscribe(&self) -> broadcast::Receiver<LifecycleSignal> {
        self.signals.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let hub = LifecycleHub::new();
        assert_eq!(hub.emit(LifecycleSignal::FocusGained), 0);

        let mut rx = hub.subscribe();
        assert_eq!(hub.emit(LifecycleSignal::VisibleAgain), 1);
        assert_eq!(rx.recv().await.unwrap(), LifecycleSignal::VisibleAgain);
    }
}
