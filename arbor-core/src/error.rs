//! Error Types
//!
//! The binding layer distinguishes configuration errors (fatal at mount)
//! from ordinary negative query results. A state that does not match the
//! requested parameters is not an error; the resolver simply reports
//! `false`. Configuration errors, on the other hand, mean the tree was
//! assembled without a reachable engine or with a relative name that has
//! no base to resolve against. Those are surfaced immediately through
//! `Result` and propagate to whatever boundary the host framework uses
//! to report mount-time failures.
//!
//! No retries happen anywhere in this layer. Subscription creation is
//! assumed reliable; if it cannot happen, mounting fails.

use thiserror::Error;

/// Errors raised while binding a rendering unit to the routing engine.
#[derive(Debug, Error)]
pub enum BindError {
    /// No routing engine is reachable from the ambient scope chain.
    ///
    /// Raised at mount time. The usual cause is a link or resolver mounted
    /// outside any engine-providing scope.
    #[error("no routing engine is reachable from the ambient scope; mount an engine provider above this subtree")]
    MissingEngine,

    /// A relative state name could not be resolved against its base.
    ///
    /// Raised when a `^` notation ascends past the registry root, or when
    /// a relative name is used with no owning state in scope and no root
    /// default.
    #[error("relative state name {name:?} cannot be resolved against {base:?}")]
    UnresolvedContext {
        /// The relative name as written.
        name: String,
        /// The base it was resolved against.
        base: String,
    },
}
