//! Active-State Resolver
//!
//! [`ActiveState`] answers one question for a mounted rendering unit: is
//! a given state currently active? The answer is a plain boolean, but
//! keeping it correct and cheap is the heart of this crate:
//!
//! 1. The initial value is computed synchronously at mount, so the first
//!    render already reflects reality. There is no default-false flash.
//!
//! 2. Every transition success triggers a recomputation, but the change
//!    callback fires only when the boolean actually flips. Consumers
//!    re-render exactly when the answer changes, not on every transition.
//!
//! 3. Inputs are compared by value: a retarget with a structurally equal
//!    parameter set is a no-op, no matter how many times the caller
//!    rebuilds the map. Identity churn never causes work.
//!
//! 4. The engine subscription is created once at mount and released
//!    exactly once when the resolver is dropped.
//!
//! # Exactness
//!
//! With `exact == true` the resolver asks the engine for an exact match:
//! the current state must equal the target (after relative resolution)
//! and every requested parameter must match. With `exact == false` the
//! current state may also be any descendant of the target. Parameter
//! matching is always the subset rule: only keys named in the request
//! are checked.
//!
//! # Relative Names
//!
//! Relative targets (`".child"`, `"^.sibling"`) resolve against the
//! ambient owning state captured at mount. Absolute targets ignore the
//! ambient context entirely, so the same absolute query yields the same
//! answer in any subtree.

use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::engine::{RoutingEngine, StateRef};
use crate::error::BindError;
use crate::params::{deep_equal, ParamSet};
use crate::scope::Scope;
use crate::subscription::TransitionSubscription;

/// The resolver's inputs: what to check, and how strictly.
#[derive(Debug, Clone)]
struct Target {
    name: String,
    params: Option<ParamSet>,
    exact: bool,
}

/// State shared between the resolver handle and its engine listener.
struct Inner {
    engine: Arc<dyn RoutingEngine>,

    /// Ambient owning state captured at mount; base for relative names.
    relative: Option<StateRef>,

    target: RwLock<Target>,

    /// Last reported boolean. Comparing against it is what suppresses
    /// redundant change reports.
    value: RwLock<bool>,

    /// Invoked with the new value whenever it flips.
    on_change: Box<dyn Fn(bool) + Send + Sync>,
}

impl Inner {
    /// Ask the engine whether the target is active right now.
    fn compute(&self) -> bool {
        let target = self.target.read().expect("target lock poisoned");
        if target.exact {
            self.engine
                .is_exact(&target.name, target.params.as_ref(), self.relative.as_ref())
        } else {
            self.engine
                .includes(&target.name, target.params.as_ref(), self.relative.as_ref())
        }
    }

    /// Recompute and report only if the value flipped.
    fn check(&self) {
        let new_value = self.compute();

        let flipped = {
            let mut value = self.value.write().expect("value lock poisoned");
            if *value == new_value {
                false
            } else {
                *value = new_value;
                true
            }
        };

        if flipped {
            debug!(active = new_value, "active state flipped");
            (self.on_change)(new_value);
        } else {
            trace!(active = new_value, "active state unchanged, report suppressed");
        }
    }
}

/// Reactive active/inactive status for one state target.
///
/// Dropping the resolver releases its engine subscription synchronously;
/// later transitions never reach the stale listener.
pub struct ActiveState {
    inner: Arc<Inner>,
    subscription: TransitionSubscription,
}

impl ActiveState {
    /// Mount a resolver using the ambient scope.
    ///
    /// The engine and the owning state (base for relative names) are read
    /// from the nearest ancestors in scope. Fails with
    /// [`BindError::MissingEngine`] when no engine is reachable.
    pub fn mount<F>(
        name: impl Into<String>,
        params: Option<ParamSet>,
        exact: bool,
        on_change: F,
    ) -> Result<Self, BindError>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let engine = Scope::current_engine()?;
        let relative = Scope::current_owner();
        Ok(Self::mount_with(
            engine, relative, name, params, exact, on_change,
        ))
    }

    /// Mount a resolver with explicitly threaded context.
    ///
    /// For hosts that pass context as parameters instead of using the
    /// ambient scope. `relative: None` resolves relative names against
    /// the engine's registry root.
    pub fn mount_with<F>(
        engine: Arc<dyn RoutingEngine>,
        relative: Option<StateRef>,
        name: impl Into<String>,
        params: Option<ParamSet>,
        exact: bool,
        on_change: F,
    ) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let inner = Arc::new(Inner {
            engine: engine.clone(),
            relative,
            target: RwLock::new(Target {
                name: name.into(),
                params,
                exact,
            }),
            value: RwLock::new(false),
            on_change: Box::new(on_change),
        });

        // Initial value, computed synchronously before anyone can read.
        // Written directly: mount itself is not a change to report.
        let initial = inner.compute();
        *inner.value.write().expect("value lock poisoned") = initial;

        let listener = inner.clone();
        let subscription =
            TransitionSubscription::subscribe(engine, move || listener.check());

        Self {
            inner,
            subscription,
        }
    }

    /// The last computed value.
    pub fn get(&self) -> bool {
        *self.inner.value.read().expect("value lock poisoned")
    }

    /// Update the resolver's inputs.
    ///
    /// A no-op unless the name differs by value, the parameters differ by
    /// deep equality, or the exactness flag differs. When inputs did
    /// change, the value is recomputed immediately and the change
    /// callback fires if it flipped.
    pub fn retarget(&self, name: impl Into<String>, params: Option<ParamSet>, exact: bool) {
        let name = name.into();
        {
            let mut target = self.inner.target.write().expect("target lock poisoned");
            if target.name == name
                && target.exact == exact
                && deep_equal(target.params.as_ref(), params.as_ref())
            {
                trace!(state = %name, "retarget with equivalent inputs, skipped");
                return;
            }
            *target = Target {
                name,
                params,
                exact,
            };
        }
        self.inner.check();
    }

    /// Whether the engine subscription is still registered.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_live()
    }
}

impl std::fmt::Debug for ActiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = self.inner.target.read().expect("target lock poisoned");
        f.debug_struct("ActiveState")
            .field("name", &target.name)
            .field("exact", &target.exact)
            .field("value", &self.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
