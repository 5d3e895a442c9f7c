//! Engine Boundary
//!
//! The routing engine is an external collaborator. It owns a tree of named
//! states, the currently active state and its parameters, and an atomic
//! transition mechanism. This module defines the surface the binding layer
//! consumes:
//!
//! - [`RoutingEngine`]: active-state queries, href generation, transitions,
//!   and the transition-success notification stream.
//! - [`StateRef`]: a cheap back-reference into the engine's state registry.
//!   The rendering tree never owns engine objects; it only points at them.
//! - [`resolve_name`]: combines a relative state notation with a base state.
//!
//! # Name Notation
//!
//! State names are dotted paths. `"a.b.c"` is absolute. A leading `.`
//! descends from the base (`".child"` under `"a"` is `"a.child"`), and `^`
//! ascends (`"^.sibling"` under `"a.b"` is `"a.sibling"`). Ascent steps
//! chain: `"^.^"` under `"a.b.c"` is `"a"`. Ascending past the root is a
//! configuration error.
//!
//! # Notification Ordering
//!
//! Listeners registered through [`RoutingEngine::on_transition_success`]
//! fire after every successful transition, strictly after the engine has
//! committed the new active state and before it begins the next transition.
//! Failed or cancelled transitions never fire.

mod memory;

pub use memory::MemoryEngine;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::BindError;
use crate::params::ParamSet;

/// A back-reference to a state in the engine's registry.
///
/// Carries the state's absolute dotted name. Cloning is cheap and never
/// implies ownership of anything engine-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateRef {
    name: String,
}

impl StateRef {
    /// Reference a state by absolute name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The registry root. Its name is the empty string and every state is
    /// its descendant.
    pub fn root() -> Self {
        Self {
            name: String::new(),
        }
    }

    /// The state's absolute dotted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the registry root.
    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// The parent state, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.name.rfind('.') {
            Some(idx) => Some(Self::named(&self.name[..idx])),
            None => Some(Self::root()),
        }
    }
}

/// Options carried by a transition or href request.
///
/// Unset fields mean "use the caller's defaults". The link affordance
/// fills `relative` with the ambient owning state (or the registry root)
/// and `inherit` with `true` before handing options to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionOptions {
    /// Base state for resolving relative target names.
    pub relative: Option<StateRef>,

    /// When true, parameters not named by the transition keep their
    /// current values instead of being dropped.
    pub inherit: Option<bool>,
}

/// Opaque handle to a registered transition listener.
///
/// Owned exclusively by the subscriber that created it; released exactly
/// once through [`RoutingEngine::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique subscription ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked after each successful transition.
pub type TransitionListener = Arc<dyn Fn() + Send + Sync>;

/// The surface of the external routing engine, consumed as a black box.
///
/// All calls are synchronous from the binding layer's point of view. Even
/// if an engine resolves transitions asynchronously, this layer only ever
/// subscribes to the completion notification; it never awaits inline.
pub trait RoutingEngine: Send + Sync {
    /// The root of the engine's state registry. Used as the default base
    /// for relative names when no ambient owner is in scope.
    fn root(&self) -> StateRef;

    /// True iff the current state equals `name` (after relative
    /// resolution) and every key in `params` matches the active values.
    fn is_exact(&self, name: &str, params: Option<&ParamSet>, relative: Option<&StateRef>)
        -> bool;

    /// True iff the current state equals `name` or is a descendant of it,
    /// under the same subset parameter rule.
    fn includes(&self, name: &str, params: Option<&ParamSet>, relative: Option<&StateRef>)
        -> bool;

    /// Generate an href for the given target, suitable for a plain
    /// hyperlink fallback. `None` when the target cannot be resolved.
    fn build_href(
        &self,
        name: &str,
        params: Option<&ParamSet>,
        options: &TransitionOptions,
    ) -> Option<String>;

    /// Begin a transition to the given target. Fire-and-forget from this
    /// layer: failures are invisible and simply produce no notification.
    fn transition_to(&self, name: &str, params: Option<&ParamSet>, options: &TransitionOptions);

    /// Register a listener on the transition-success stream.
    fn on_transition_success(&self, listener: TransitionListener) -> SubscriptionId;

    /// Release a previously registered listener. Releasing an unknown or
    /// already-released id is a no-op.
    fn release(&self, id: SubscriptionId);
}

/// Resolve a possibly-relative state name against a base state.
///
/// Absolute names pass through untouched regardless of `base`. Relative
/// names (leading `.` or `^`) combine with the base's dotted path.
pub fn resolve_name(name: &str, base: &StateRef) -> Result<String, BindError> {
    if !name.starts_with('.') && !name.starts_with('^') {
        return Ok(name.to_string());
    }

    let mut segments: Vec<&str> = base
        .name()
        .split('.')
        .filter(|s| !s.is_empty())
        .collect();

    let unresolved = || BindError::UnresolvedContext {
        name: name.to_string(),
        base: base.name().to_string(),
    };

    // Consume leading ascent steps: "^", "^.^", "^.rest", ...
    let mut rest = name;
    loop {
        if rest == "^" {
            if segments.pop().is_none() {
                return Err(unresolved());
            }
            rest = "";
            break;
        }
        if let Some(tail) = rest.strip_prefix("^.") {
            if segments.pop().is_none() {
                return Err(unresolved());
            }
            rest = tail;
            continue;
        }
        break;
    }

    // A caret must stand alone or be followed by '.'; anything else
    // ("^x") is malformed, not a literal segment.
    if rest.starts_with('^') {
        return Err(unresolved());
    }

    // A leading '.' descends from the base; "." alone is the base itself.
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    segments.extend(rest.split('.').filter(|s| !s.is_empty()));

    Ok(segments.join("."))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
