//! Link Affordance
//!
//! [`Link`] turns a state target into something that renders and behaves
//! like an ordinary hyperlink while navigating through the engine:
//!
//! - an href generated by the engine, so the element degrades to a plain
//!   link (copy address, open in new tab);
//! - click interception that routes primary clicks through
//!   `transition_to` instead of full navigation, while passing modifier
//!   gestures (Ctrl/Meta, middle button) and already-handled events
//!   through untouched;
//! - active-state styling driven by the same resolver the rest of the
//!   crate uses.
//!
//! A link can only function with a reachable engine; mounting one
//! outside any engine-providing scope is a configuration error and fails
//! immediately rather than producing a dead link.
//!
//! # Option Defaults
//!
//! When the caller does not say otherwise, transitions and hrefs resolve
//! relative to the ambient owning state (or the registry root when the
//! link is mounted outside any state-owning subtree) and inherit the
//! current parameters. Caller-supplied options override both defaults
//! field by field.

use std::sync::Arc;

use tracing::debug;

use crate::active::ActiveState;
use crate::engine::{RoutingEngine, StateRef, TransitionOptions};
use crate::error::BindError;
use crate::params::ParamSet;
use crate::scope::{Registration, Scope};

/// Which mouse button produced a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

/// A click as observed by the host, reduced to the fields interception
/// cares about.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub button: MouseButton,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    default_prevented: bool,
}

impl ClickEvent {
    /// A plain primary click with no modifiers.
    pub fn primary() -> Self {
        Self::with_button(MouseButton::Primary)
    }

    /// A click with the given button and no modifiers.
    pub fn with_button(button: MouseButton) -> Self {
        Self {
            button,
            ctrl: false,
            meta: false,
            shift: false,
            default_prevented: false,
        }
    }

    /// Suppress the host's default handling of this event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether default handling was already suppressed.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A navigation affordance bound to one state target.
///
/// Dropping the link tears down its active-state subscription and its
/// registrar entry.
pub struct Link {
    engine: Arc<dyn RoutingEngine>,
    target: String,
    params: Option<ParamSet>,

    /// Caller-supplied option overrides; unset fields fall back to the
    /// ambient defaults.
    options: TransitionOptions,

    /// Ambient owning state at mount, or the registry root.
    default_relative: StateRef,

    active: ActiveState,

    /// Entry with the nearest ambient registrar, if one was in scope.
    _registration: Registration,
}

impl Link {
    /// Mount a link using the ambient scope.
    ///
    /// Fails with [`BindError::MissingEngine`] when no engine is
    /// reachable from the scope chain. When an ancestor published a
    /// registrar, the link's target is registered with it until drop.
    ///
    /// `on_active_change` fires whenever the link's active status flips,
    /// so the host can restyle without polling.
    pub fn mount<F>(
        target: impl Into<String>,
        params: Option<ParamSet>,
        options: TransitionOptions,
        on_active_change: F,
    ) -> Result<Self, BindError>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let target = target.into();
        let engine = Scope::current_engine()?;
        let owner = Scope::current_owner();
        let default_relative = owner.clone().unwrap_or_else(|| engine.root());

        let registration = match Scope::current_registrar() {
            Some(registrar) => registrar(&target, params.as_ref()),
            None => Registration::none(),
        };

        let active = ActiveState::mount_with(
            engine.clone(),
            owner,
            target.clone(),
            params.clone(),
            false,
            on_active_change,
        );

        debug!(state = %target, "link mounted");

        Ok(Self {
            engine,
            target,
            params,
            options,
            default_relative,
            active,
            _registration: registration,
        })
    }

    /// The engine-generated href for this link's target, or `None` when
    /// the target does not resolve.
    pub fn href(&self) -> Option<String> {
        self.engine
            .build_href(&self.target, self.params.as_ref(), &self.resolved_options())
    }

    /// Handle a click on the link.
    ///
    /// Returns true when the click was intercepted: default handling is
    /// suppressed and an engine transition starts. Middle clicks,
    /// Ctrl/Meta gestures, and events something else already prevented
    /// pass through untouched so the host's native behavior (open in new
    /// tab, etc.) is preserved.
    pub fn handle_click(&self, event: &mut ClickEvent) -> bool {
        let intercept = !event.default_prevented()
            && event.button == MouseButton::Primary
            && !event.ctrl
            && !event.meta;
        if !intercept {
            return false;
        }

        event.prevent_default();
        debug!(state = %self.target, "navigating via engine transition");
        self.engine
            .transition_to(&self.target, self.params.as_ref(), &self.resolved_options());
        true
    }

    /// Whether the link's target (or a descendant of it) is active.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Compose a class attribute: the base classes plus `active_class`
    /// when the target is active.
    pub fn class_attr(&self, base: Option<&str>, active_class: &str) -> String {
        let mut classes = base.unwrap_or("").to_string();
        if self.is_active() {
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(active_class);
        }
        classes
    }

    /// Caller overrides layered over the ambient defaults.
    fn resolved_options(&self) -> TransitionOptions {
        TransitionOptions {
            relative: self
                .options
                .relative
                .clone()
                .or_else(|| Some(self.default_relative.clone())),
            inherit: self.options.inherit.or(Some(true)),
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("target", &self.target)
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::scope::Registrar;
    use serde_json::json;
    use std::sync::Mutex;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ParamSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn mounted_engine(states: &[&str]) -> Arc<MemoryEngine> {
        Arc::new(MemoryEngine::with_states(states))
    }

    #[test]
    fn mount_without_engine_is_fatal() {
        let result = Link::mount("a", None, TransitionOptions::default(), |_| {});
        assert!(matches!(result, Err(BindError::MissingEngine)));
    }

    #[test]
    fn primary_click_navigates_through_the_engine() {
        let engine = mounted_engine(&["contacts"]);
        let _scope = Scope::provide_engine(engine.clone());

        let link =
            Link::mount("contacts", None, TransitionOptions::default(), |_| {}).unwrap();

        let mut event = ClickEvent::primary();
        assert!(link.handle_click(&mut event));
        assert!(event.default_prevented());
        assert_eq!(engine.current_state(), "contacts");
    }

    #[test]
    fn ctrl_click_passes_through() {
        let engine = mounted_engine(&["contacts"]);
        let _scope = Scope::provide_engine(engine.clone());

        let link =
            Link::mount("contacts", None, TransitionOptions::default(), |_| {}).unwrap();

        let mut event = ClickEvent::primary();
        event.ctrl = true;
        assert!(!link.handle_click(&mut event));
        assert!(!event.default_prevented());
        assert_eq!(engine.current_state(), "");
    }

    #[test]
    fn meta_middle_and_prevented_clicks_pass_through() {
        let engine = mounted_engine(&["contacts"]);
        let _scope = Scope::provide_engine(engine.clone());

        let link =
            Link::mount("contacts", None, TransitionOptions::default(), |_| {}).unwrap();

        let mut meta = ClickEvent::primary();
        meta.meta = true;
        assert!(!link.handle_click(&mut meta));
        assert!(!meta.default_prevented());

        let mut middle = ClickEvent::with_button(MouseButton::Middle);
        assert!(!link.handle_click(&mut middle));
        assert!(!middle.default_prevented());

        let mut handled = ClickEvent::primary();
        handled.prevent_default();
        assert!(!link.handle_click(&mut handled));

        assert_eq!(engine.current_state(), "");
    }

    #[test]
    fn shift_click_is_still_intercepted() {
        // Only Ctrl/Meta (and the middle button) force native handling.
        let engine = mounted_engine(&["contacts"]);
        let _scope = Scope::provide_engine(engine.clone());

        let link =
            Link::mount("contacts", None, TransitionOptions::default(), |_| {}).unwrap();

        let mut event = ClickEvent::primary();
        event.shift = true;
        assert!(link.handle_click(&mut event));
        assert_eq!(engine.current_state(), "contacts");
    }

    #[test]
    fn href_uses_the_ambient_relative_default() {
        let engine = mounted_engine(&["a.child"]);
        let _root = Scope::provide_engine(engine);
        let _owner = Scope::own_state(StateRef::named("a"));

        let link =
            Link::mount(".child", None, TransitionOptions::default(), |_| {}).unwrap();
        assert_eq!(link.href().as_deref(), Some("/a/child"));
    }

    #[test]
    fn relative_target_navigates_against_ambient_owner() {
        let engine = mounted_engine(&["a.child"]);
        let _root = Scope::provide_engine(engine.clone());
        let _owner = Scope::own_state(StateRef::named("a"));

        let link =
            Link::mount(".child", None, TransitionOptions::default(), |_| {}).unwrap();
        link.handle_click(&mut ClickEvent::primary());
        assert_eq!(engine.current_state(), "a.child");
    }

    #[test]
    fn caller_options_override_defaults() {
        let engine = mounted_engine(&["a.child", "b"]);
        let _root = Scope::provide_engine(engine.clone());
        let _owner = Scope::own_state(StateRef::named("b"));

        // Explicit relative beats the ambient owner.
        let link = Link::mount(
            ".child",
            None,
            TransitionOptions {
                relative: Some(StateRef::named("a")),
                inherit: None,
            },
            |_| {},
        )
        .unwrap();
        link.handle_click(&mut ClickEvent::primary());
        assert_eq!(engine.current_state(), "a.child");
    }

    #[test]
    fn transitions_inherit_params_by_default() {
        let engine = mounted_engine(&["a", "b"]);
        engine.transition_to(
            "a",
            Some(&params(&[("lang", json!("en"))])),
            &TransitionOptions::default(),
        );
        let _scope = Scope::provide_engine(engine.clone());

        let inheriting =
            Link::mount("b", None, TransitionOptions::default(), |_| {}).unwrap();
        inheriting.handle_click(&mut ClickEvent::primary());
        assert_eq!(engine.current_params(), params(&[("lang", json!("en"))]));

        let replacing = Link::mount(
            "a",
            None,
            TransitionOptions {
                relative: None,
                inherit: Some(false),
            },
            |_| {},
        )
        .unwrap();
        replacing.handle_click(&mut ClickEvent::primary());
        assert!(engine.current_params().is_empty());
    }

    #[test]
    fn styling_tracks_the_active_state() {
        let engine = mounted_engine(&["contacts.list", "about"]);
        let _scope = Scope::provide_engine(engine.clone());

        let link =
            Link::mount("contacts", None, TransitionOptions::default(), |_| {}).unwrap();
        assert!(!link.is_active());
        assert_eq!(link.class_attr(Some("nav-item"), "active"), "nav-item");

        engine.transition_to("contacts.list", None, &TransitionOptions::default());
        assert!(link.is_active());
        assert_eq!(
            link.class_attr(Some("nav-item"), "active"),
            "nav-item active"
        );
        assert_eq!(link.class_attr(None, "active"), "active");
    }

    #[test]
    fn link_registers_with_the_ambient_registrar() {
        let engine = mounted_engine(&["a.b"]);
        let targets: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let targets_clone = targets.clone();
        let registrar: Registrar = Arc::new(move |target, _params| {
            let targets = targets_clone.clone();
            let entry = target.to_string();
            targets.lock().unwrap().push(entry.clone());
            let targets_for_dereg = targets_clone.clone();
            Registration::new(move || {
                targets_for_dereg.lock().unwrap().retain(|t| t != &entry);
            })
        });

        let _root = Scope::provide_engine(engine);
        let _reg = Scope::with_registrar(registrar);

        let link =
            Link::mount("a.b", None, TransitionOptions::default(), |_| {}).unwrap();
        assert_eq!(*targets.lock().unwrap(), vec!["a.b".to_string()]);

        drop(link);
        assert!(targets.lock().unwrap().is_empty());
    }
}
