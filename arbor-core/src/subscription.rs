//! Transition Subscription
//!
//! A scoped subscription to the engine's transition-success stream. Each
//! mounted consumer holds exactly one: created at mount, released exactly
//! once at unmount. Re-renders and input updates never touch it, so a
//! subtree cannot accumulate duplicate listeners.
//!
//! Release happens on every exit path because the handle releases itself
//! on drop. A manual [`release`](TransitionSubscription::release) is
//! idempotent; releasing twice is tolerated but the second call is a
//! no-op, never a double release into the engine.

use std::sync::Arc;

use tracing::debug;

use crate::engine::{RoutingEngine, SubscriptionId, TransitionListener};

/// RAII handle for a single listener on the transition-success stream.
pub struct TransitionSubscription {
    engine: Arc<dyn RoutingEngine>,
    id: Option<SubscriptionId>,
}

impl TransitionSubscription {
    /// Register `listener` with the engine's notification stream.
    ///
    /// The listener fires after every successful transition until the
    /// subscription is released or dropped.
    pub fn subscribe<F>(engine: Arc<dyn RoutingEngine>, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener: TransitionListener = Arc::new(listener);
        let id = engine.on_transition_success(listener);
        debug!(?id, "subscribed to transition successes");
        Self {
            engine,
            id: Some(id),
        }
    }

    /// Release the engine-side listener. Idempotent.
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.engine.release(id);
            debug!(?id, "released transition subscription");
        }
    }

    /// Whether the engine-side listener is still registered.
    pub fn is_live(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for TransitionSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TransitionSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionSubscription")
            .field("id", &self.id)
            .finish()
    }
}
