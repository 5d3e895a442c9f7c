//! Ambient Scope
//!
//! The scope tracks, per tree position, which routing engine and which
//! owning state a rendering unit should resolve against. It is inherited
//! down the tree: a descendant always observes its nearest ancestor's
//! published values, never a sibling's and never a process-wide
//! "current" one.
//!
//! # Implementation
//!
//! Render passes are serialized (the host framework drives them
//! cooperatively, depth-first), so we use a thread-local stack of scope
//! entries. Entering a subtree pushes an entry; leaving pops it. Reads
//! walk the stack from the top and take the nearest entry that publishes
//! the requested field. Sibling subtrees are rendered one after another,
//! each inside its own push/pop pair, so they observe disjoint scopes.
//!
//! Entries carry explicit typed fields (engine handle, owning state,
//! registrar callback) rather than a string-keyed bag, so a reader can
//! only ask for things the scope actually models.
//!
//! # Guards
//!
//! [`Scope`] is a guard that pops its entry when dropped. This keeps the
//! stack correct on every exit path, including panics during a render.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::{RoutingEngine, StateRef};
use crate::error::BindError;
use crate::params::ParamSet;

/// Counter for scope entry IDs, used to catch mismatched push/pop.
static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = RefCell::new(Vec::new());
}

/// Callback with which link affordances announce their target to an
/// ancestor (for example, a navigation menu highlighting any item whose
/// registered target is active). Returns a guard that deregisters the
/// entry when dropped.
pub type Registrar = Arc<dyn Fn(&str, Option<&ParamSet>) -> Registration + Send + Sync>;

/// Deregistration guard handed out by a [`Registrar`].
///
/// The deregistration callback runs exactly once: either through
/// [`Registration::deregister`] or on drop, whichever comes first.
pub struct Registration {
    dereg: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    /// A registration with a deregistration callback.
    pub fn new<F>(dereg: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            dereg: Some(Box::new(dereg)),
        }
    }

    /// A registration that deregisters nothing. Used when no registrar
    /// is in scope.
    pub fn none() -> Self {
        Self { dereg: None }
    }

    /// Deregister now instead of waiting for drop. Idempotent.
    pub fn deregister(&mut self) {
        if let Some(dereg) = self.dereg.take() {
            dereg();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("live", &self.dereg.is_some())
            .finish()
    }
}

/// One published frame of ambient context.
struct ScopeEntry {
    id: u64,
    engine: Option<Arc<dyn RoutingEngine>>,
    owner: Option<StateRef>,
    registrar: Option<Registrar>,
}

/// Guard for a published scope entry. Pops the entry when dropped.
pub struct Scope {
    id: u64,
}

impl Scope {
    fn push(entry: ScopeEntry) -> Self {
        let id = entry.id;
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(entry));
        Self { id }
    }

    fn entry() -> ScopeEntry {
        ScopeEntry {
            id: SCOPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            engine: None,
            owner: None,
            registrar: None,
        }
    }

    /// Publish an engine handle for the subtree. This is the tree-root
    /// provider; every consumer below it resolves against this engine.
    pub fn provide_engine(engine: Arc<dyn RoutingEngine>) -> Self {
        Self::push(ScopeEntry {
            engine: Some(engine),
            ..Self::entry()
        })
    }

    /// Publish an owning state for the subtree. Descendants resolve
    /// relative names against it. Must be entered before any descendant's
    /// first evaluation, which the guard pattern enforces by construction.
    pub fn own_state(owner: StateRef) -> Self {
        Self::push(ScopeEntry {
            owner: Some(owner),
            ..Self::entry()
        })
    }

    /// Publish a registrar for the subtree.
    pub fn with_registrar(registrar: Registrar) -> Self {
        Self::push(ScopeEntry {
            registrar: Some(registrar),
            ..Self::entry()
        })
    }

    /// The nearest published engine handle.
    ///
    /// A missing engine is a fatal configuration error: nothing below
    /// this point can function, so mounting must fail immediately.
    pub fn current_engine() -> Result<Arc<dyn RoutingEngine>, BindError> {
        SCOPE_STACK
            .with(|stack| {
                stack
                    .borrow()
                    .iter()
                    .rev()
                    .find_map(|entry| entry.engine.clone())
            })
            .ok_or(BindError::MissingEngine)
    }

    /// The nearest published owning state, if any.
    pub fn current_owner() -> Option<StateRef> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find_map(|entry| entry.owner.clone())
        })
    }

    /// The nearest published registrar, if any.
    pub fn current_registrar() -> Option<Registrar> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find_map(|entry| entry.registrar.clone())
        })
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched nesting: guards must drop in reverse
            // order of creation.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.id, self.id,
                    "Scope mismatch: expected entry {}, got {}",
                    self.id, entry.id
                );
            }
        });
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("id", &self.id).finish()
    }
}
