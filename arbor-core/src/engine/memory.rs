//! In-Memory Engine
//!
//! A small, synchronous implementation of [`RoutingEngine`] backed by a
//! plain registry of dotted state names. It exists to exercise the binding
//! layer: integration tests, examples, and hosts that do not yet have a
//! full routing engine all run against it.
//!
//! # Semantics
//!
//! - Registering `"a.b.c"` implicitly registers `"a.b"` and `"a"`. The
//!   root (empty name) always exists and starts active.
//! - A transition to an unknown or unresolvable target is ignored: no
//!   commit, no notification. Listeners therefore only ever observe
//!   successful transitions.
//! - Listeners are notified in subscription order, strictly after the new
//!   state and parameters are committed. Dispatch is synchronous; a
//!   listener must not start another transition reentrantly.

use std::collections::HashSet;
use std::sync::{Mutex, RwLock};

use tracing::{debug, trace, warn};

use super::{
    resolve_name, RoutingEngine, StateRef, SubscriptionId, TransitionListener, TransitionOptions,
};
use crate::params::{matches_subset, ParamSet};

/// The committed active state.
#[derive(Debug, Clone, Default)]
struct Current {
    name: String,
    params: ParamSet,
}

/// A registry-backed, synchronous routing engine.
pub struct MemoryEngine {
    /// Absolute names of every registered state.
    registry: RwLock<HashSet<String>>,

    /// The active state and its parameters.
    current: RwLock<Current>,

    /// Transition-success listeners, in subscription order.
    listeners: Mutex<Vec<(SubscriptionId, TransitionListener)>>,
}

impl MemoryEngine {
    /// Create an engine whose registry holds only the root.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashSet::from([String::new()])),
            current: RwLock::new(Current::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Create an engine pre-populated with the given states.
    pub fn with_states(names: &[&str]) -> Self {
        let engine = Self::new();
        for name in names {
            engine.register(name);
        }
        engine
    }

    /// Register a state and all of its ancestors.
    pub fn register(&self, name: &str) {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        let mut current = name;
        loop {
            registry.insert(current.to_string());
            match current.rfind('.') {
                Some(idx) => current = &current[..idx],
                None => break,
            }
        }
    }

    /// Absolute name of the active state.
    pub fn current_state(&self) -> String {
        self.current
            .read()
            .expect("current lock poisoned")
            .name
            .clone()
    }

    /// Parameters of the active state.
    pub fn current_params(&self) -> ParamSet {
        self.current
            .read()
            .expect("current lock poisoned")
            .params
            .clone()
    }

    /// Number of live transition listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().expect("listeners lock poisoned").len()
    }

    /// Resolve a target name against the options' relative base (or the
    /// root), and check it against the registry.
    fn resolve_registered(&self, name: &str, relative: Option<&StateRef>) -> Option<String> {
        let base = relative.cloned().unwrap_or_else(StateRef::root);
        let resolved = match resolve_name(name, &base) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(state = name, %err, "state name did not resolve");
                return None;
            }
        };

        let registry = self.registry.read().expect("registry lock poisoned");
        if registry.contains(&resolved) {
            Some(resolved)
        } else {
            None
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingEngine for MemoryEngine {
    fn root(&self) -> StateRef {
        StateRef::root()
    }

    fn is_exact(
        &self,
        name: &str,
        params: Option<&ParamSet>,
        relative: Option<&StateRef>,
    ) -> bool {
        let Some(resolved) = self.resolve_registered(name, relative) else {
            return false;
        };

        let current = self.current.read().expect("current lock poisoned");
        if current.name != resolved {
            return false;
        }
        params
            .map(|wanted| matches_subset(wanted, &current.params))
            .unwrap_or(true)
    }

    fn includes(
        &self,
        name: &str,
        params: Option<&ParamSet>,
        relative: Option<&StateRef>,
    ) -> bool {
        let Some(resolved) = self.resolve_registered(name, relative) else {
            return false;
        };

        let current = self.current.read().expect("current lock poisoned");
        let in_subtree = resolved.is_empty()
            || current.name == resolved
            || current
                .name
                .strip_prefix(&resolved)
                .map(|rest| rest.starts_with('.'))
                .unwrap_or(false);
        if !in_subtree {
            return false;
        }
        params
            .map(|wanted| matches_subset(wanted, &current.params))
            .unwrap_or(true)
    }

    fn build_href(
        &self,
        name: &str,
        params: Option<&ParamSet>,
        options: &TransitionOptions,
    ) -> Option<String> {
        let resolved = self.resolve_registered(name, options.relative.as_ref())?;

        let mut href = String::from("/");
        href.push_str(&resolved.replace('.', "/"));

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let query: Vec<String> = params
                .iter()
                .map(|(key, value)| match value.as_str() {
                    Some(s) => format!("{key}={s}"),
                    None => format!("{key}={value}"),
                })
                .collect();
            href.push('?');
            href.push_str(&query.join("&"));
        }

        Some(href)
    }

    fn transition_to(&self, name: &str, params: Option<&ParamSet>, options: &TransitionOptions) {
        let Some(resolved) = self.resolve_registered(name, options.relative.as_ref()) else {
            warn!(state = name, "ignoring transition to unknown state");
            return;
        };

        // Commit atomically, then notify. The current lock is released
        // before dispatch so listeners can query the engine.
        {
            let mut current = self.current.write().expect("current lock poisoned");
            let inherit = options.inherit.unwrap_or(false);
            let mut next_params = if inherit {
                current.params.clone()
            } else {
                ParamSet::new()
            };
            if let Some(params) = params {
                for (key, value) in params {
                    next_params.insert(key.clone(), value.clone());
                }
            }
            current.name = resolved.clone();
            current.params = next_params;
        }

        debug!(state = %resolved, "transition committed");

        // Snapshot under the lock, dispatch outside it, in subscription
        // order. The whole dispatch finishes before transition_to returns,
        // so two transitions' notifications never interleave.
        let snapshot: Vec<TransitionListener> = self
            .listeners
            .lock()
            .expect("listeners lock poisoned")
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(listeners = snapshot.len(), "dispatching transition success");
        for listener in snapshot {
            listener();
        }
    }

    fn on_transition_success(&self, listener: TransitionListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners
            .lock()
            .expect("listeners lock poisoned")
            .push((id, listener));
        debug!(?id, "transition listener registered");
        id
    }

    fn release(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .expect("listeners lock poisoned")
            .retain(|(existing, _)| *existing != id);
        debug!(?id, "transition listener released");
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ParamSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn registering_a_leaf_registers_ancestors() {
        let engine = MemoryEngine::new();
        engine.register("a.b.c");

        engine.transition_to("a.b", None, &TransitionOptions::default());
        assert_eq!(engine.current_state(), "a.b");
    }

    #[test]
    fn starts_at_root() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.current_state(), "");
    }

    #[test]
    fn unknown_target_is_ignored() {
        let engine = MemoryEngine::with_states(&["a"]);
        engine.transition_to("a", None, &TransitionOptions::default());

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        let _id = engine.on_transition_success(Arc::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        engine.transition_to("nope", None, &TransitionOptions::default());

        // No commit, no notification.
        assert_eq!(engine.current_state(), "a");
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listeners_fire_after_commit() {
        let engine = Arc::new(MemoryEngine::with_states(&["a.b"]));

        let observed = Arc::new(Mutex::new(String::new()));
        let observed_clone = observed.clone();
        let engine_clone = engine.clone();
        let _id = engine.on_transition_success(Arc::new(move || {
            *observed_clone.lock().unwrap() = engine_clone.current_state();
        }));

        engine.transition_to("a.b", None, &TransitionOptions::default());
        assert_eq!(*observed.lock().unwrap(), "a.b");
    }

    #[test]
    fn listeners_fire_in_subscription_order() {
        let engine = MemoryEngine::with_states(&["a"]);

        let order = Arc::new(Mutex::new(Vec::new()));
        for label in [1, 2, 3] {
            let order_clone = order.clone();
            let _id = engine.on_transition_success(Arc::new(move || {
                order_clone.lock().unwrap().push(label);
            }));
        }

        engine.transition_to("a", None, &TransitionOptions::default());
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn released_listener_does_not_fire() {
        let engine = MemoryEngine::with_states(&["a"]);

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        let id = engine.on_transition_success(Arc::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        engine.transition_to("a", None, &TransitionOptions::default());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        engine.release(id);
        assert_eq!(engine.listener_count(), 0);

        engine.transition_to("a", None, &TransitionOptions::default());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exactness_against_a_nested_state() {
        let engine = MemoryEngine::with_states(&["a.b.c"]);
        engine.transition_to("a.b.c", None, &TransitionOptions::default());

        assert!(!engine.is_exact("a.b", None, None));
        assert!(engine.includes("a.b", None, None));
        assert!(engine.is_exact("a.b.c", None, None));
        assert!(engine.includes("a.b.c", None, None));
    }

    #[test]
    fn includes_does_not_match_name_prefixes() {
        let engine = MemoryEngine::with_states(&["ab", "a"]);
        engine.transition_to("ab", None, &TransitionOptions::default());

        // "ab" is not a descendant of "a" even though the string is a prefix.
        assert!(!engine.includes("a", None, None));
    }

    #[test]
    fn root_includes_everything() {
        let engine = MemoryEngine::with_states(&["a.b"]);
        engine.transition_to("a.b", None, &TransitionOptions::default());

        assert!(engine.includes("", None, None));
    }

    #[test]
    fn params_match_as_subset() {
        let engine = MemoryEngine::with_states(&["contacts.contact"]);
        engine.transition_to(
            "contacts.contact",
            Some(&params(&[("contactId", json!("joe")), ("tab", json!(1))])),
            &TransitionOptions::default(),
        );

        let wanted = params(&[("contactId", json!("joe"))]);
        assert!(engine.is_exact("contacts.contact", Some(&wanted), None));

        let wrong = params(&[("contactId", json!("jane"))]);
        assert!(!engine.is_exact("contacts.contact", Some(&wrong), None));
    }

    #[test]
    fn relative_queries_resolve_against_base() {
        let engine = MemoryEngine::with_states(&["a.child"]);
        engine.transition_to("a.child", None, &TransitionOptions::default());

        let base = StateRef::named("a");
        assert!(engine.is_exact(".child", None, Some(&base)));
        assert!(engine.includes(".", None, Some(&base)));
    }

    #[test]
    fn inherit_merges_params() {
        let engine = MemoryEngine::with_states(&["a.b"]);
        engine.transition_to(
            "a.b",
            Some(&params(&[("x", json!(1)), ("y", json!(2))])),
            &TransitionOptions::default(),
        );

        engine.transition_to(
            "a.b",
            Some(&params(&[("y", json!(3))])),
            &TransitionOptions {
                inherit: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(
            engine.current_params(),
            params(&[("x", json!(1)), ("y", json!(3))])
        );

        engine.transition_to(
            "a.b",
            Some(&params(&[("y", json!(4))])),
            &TransitionOptions::default(),
        );
        assert_eq!(engine.current_params(), params(&[("y", json!(4))]));
    }

    #[test]
    fn href_joins_segments_and_params() {
        let engine = MemoryEngine::with_states(&["contacts.contact"]);

        let href = engine.build_href(
            "contacts.contact",
            Some(&params(&[("contactId", json!("joe"))])),
            &TransitionOptions::default(),
        );
        assert_eq!(href.as_deref(), Some("/contacts/contact?contactId=joe"));

        let bare = engine.build_href("contacts", None, &TransitionOptions::default());
        assert_eq!(bare.as_deref(), Some("/contacts"));

        let unknown = engine.build_href("nope", None, &TransitionOptions::default());
        assert!(unknown.is_none());
    }

    #[test]
    fn href_resolves_relative_targets() {
        let engine = MemoryEngine::with_states(&["a.child"]);

        let href = engine.build_href(
            ".child",
            None,
            &TransitionOptions {
                relative: Some(StateRef::named("a")),
                ..Default::default()
            },
        );
        assert_eq!(href.as_deref(), Some("/a/child"));
    }
}
