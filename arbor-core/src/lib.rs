//! Arbor Core
//!
//! This crate provides the core binding layer between a declarative,
//! tree-structured rendering model and an external hierarchical routing
//! engine. It implements:
//!
//! - Ambient, tree-inherited context (engine handle, owning state,
//!   registrar) with nearest-ancestor semantics
//! - Reactive active-state resolution with memoized change suppression
//! - Scoped subscriptions to the engine's transition-success stream
//! - A link affordance composing href generation, click interception,
//!   and active-state styling
//!
//! The routing engine itself is consumed as a black box through the
//! [`engine::RoutingEngine`] trait; an in-memory reference engine is
//! included for tests and hosts without a full engine.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `engine`: the engine boundary (trait, state references, name
//!   resolution) and the in-memory reference implementation
//! - `params`: parameter sets, deep equality, subset matching
//! - `scope`: the ambient context registry
//! - `subscription`: transition-subscription lifecycle
//! - `active`: the active-state resolver
//! - `link`: the link affordance
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arbor_core::{ActiveState, Link, MemoryEngine, Scope, StateRef, TransitionOptions};
//!
//! let engine = Arc::new(MemoryEngine::with_states(&["contacts.list"]));
//! let _root = Scope::provide_engine(engine.clone());
//! let _owner = Scope::own_state(StateRef::named("contacts"));
//!
//! // Re-renders only when the answer flips.
//! let is_active = ActiveState::mount(".list", None, true, |active| {
//!     println!("contacts.list active: {active}");
//! })?;
//!
//! let link = Link::mount(".list", None, TransitionOptions::default(), |_| {})?;
//! println!("{:?}", link.href());
//! ```

pub mod active;
pub mod engine;
pub mod error;
pub mod link;
pub mod params;
pub mod scope;
pub mod subscription;

pub use active::ActiveState;
pub use engine::{
    resolve_name, MemoryEngine, RoutingEngine, StateRef, SubscriptionId, TransitionListener,
    TransitionOptions,
};
pub use error::BindError;
pub use link::{ClickEvent, Link, MouseButton};
pub use params::{deep_equal, matches_subset, ParamSet, ParamValue};
pub use scope::{Registrar, Registration, Scope};
pub use subscription::TransitionSubscription;
