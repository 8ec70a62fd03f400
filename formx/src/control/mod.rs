//! Form controls.
//!
//! A [`Control`] owns one control element, or a group of same-name
//! radio/checkbox members, and validates it against the merged global and
//! local validator sets.

mod check;
mod listen;
pub(crate) mod set;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use formdom::{ChangeNotifier, Document, ListenerId, NodeId, ObserverId};
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{truthy, Config};
use crate::error::Error;
use crate::registry::Registry;
use crate::validator::{Attributes, Validator, ValidatorName};

use listen::Signal;

static NEXT_CONTROL_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique control identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(usize);

impl ControlId {
    fn next() -> Self {
        Self(NEXT_CONTROL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "control-{}", self.0)
    }
}

pub(crate) struct ControlState {
    el: NodeId,
    members: Vec<NodeId>,

    valid: bool,
    checking: bool,
    started: bool,
    destroyed: bool,
    // Distinct, in insertion order.
    errors: Vec<String>,

    // Local validators; same-name entries shadow global ones.
    validators: Vec<Arc<Validator>>,

    repeat_events: Vec<String>,
    start_events: Vec<String>,
    repeat_listeners: Vec<(NodeId, ListenerId)>,
    start_listeners: Vec<(NodeId, ListenerId)>,
    observer: Option<ObserverId>,
}

pub(crate) struct ControlShared {
    id: ControlId,
    doc: Document,
    registry: Registry,
    state: RwLock<ControlState>,
    // Bumped by every check; a check whose generation is stale was revoked.
    generation: AtomicU64,
    signals: mpsc::UnboundedSender<Signal>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Validation state of one form field.
///
/// Cloning is cheap; all clones share the same state. Event listeners and the
/// attribute observer are wired on construction and run on the Tokio runtime
/// that was current at that time.
#[derive(Clone)]
pub struct Control {
    shared: Arc<ControlShared>,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Control")
            .field("id", &self.shared.id)
            .field("el", &state.el)
            .field("members", &state.members)
            .field("valid", &state.valid)
            .field("checking", &state.checking)
            .field("errors", &state.errors)
            .finish()
    }
}

impl Control {
    /// Attach a control to a single control element.
    pub fn new(doc: &Document, el: NodeId, registry: &Registry) -> Result<Self, Error> {
        Self::with_members(doc, vec![el], registry)
    }

    /// Attach a control to a group of elements. The first one is the primary
    /// element: its attributes configure the control.
    pub fn with_members(doc: &Document, members: Vec<NodeId>, registry: &Registry) -> Result<Self, Error> {
        let Some(&el) = members.first() else {
            return Err(Error::NotAControl(doc.root()));
        };
        if let Some(&bad) = members.iter().find(|m| !doc.is_control(**m)) {
            return Err(Error::NotAControl(bad));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let config = registry.config();
        let repeat_events = config.split_multi(doc.attribute(el, &config.on).as_deref());
        let start_events = config.split_multi(doc.attribute(el, &config.start_on).as_deref());

        let (tx, rx) = mpsc::unbounded_channel();
        let control = Self {
            shared: Arc::new(ControlShared {
                id: ControlId::next(),
                doc: doc.clone(),
                registry: registry.clone(),
                state: RwLock::new(ControlState {
                    el,
                    members,
                    valid: true,
                    checking: false,
                    started: false,
                    destroyed: false,
                    errors: Vec::new(),
                    validators: Vec::new(),
                    repeat_events,
                    start_events,
                    repeat_listeners: Vec::new(),
                    start_listeners: Vec::new(),
                    observer: None,
                }),
                generation: AtomicU64::new(0),
                signals: tx,
                driver: Mutex::new(None),
            }),
        };

        let driver = runtime.spawn(listen::drive(Arc::downgrade(&control.shared), rx));
        if let Ok(mut slot) = control.shared.driver.lock() {
            *slot = Some(driver);
        }

        debug!("[control] {} attached to {el}", control.id());

        control.observe_primary();
        control.bind_start();
        if control.read().start_events.is_empty() {
            control.start();
        }
        control.reflect_initial();

        Ok(control)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ControlState> {
        self.shared
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ControlState> {
        self.shared
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether two handles refer to the same control.
    pub fn ptr_eq(&self, other: &Control) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> ControlId {
        self.shared.id
    }

    pub fn document(&self) -> &Document {
        &self.shared.doc
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn config(&self) -> &Config {
        self.shared.registry.config()
    }

    /// The primary element.
    pub fn element(&self) -> NodeId {
        self.read().el
    }

    /// All member elements, primary first.
    pub fn members(&self) -> Vec<NodeId> {
        self.read().members.clone()
    }

    /// Validity as of the last completed check.
    pub fn valid(&self) -> bool {
        self.read().valid
    }

    /// Whether a check is in progress.
    pub fn checking(&self) -> bool {
        self.read().checking
    }

    pub fn started(&self) -> bool {
        self.read().started
    }

    pub fn is_destroyed(&self) -> bool {
        self.read().destroyed
    }

    /// Distinct failure reasons of the last completed check.
    pub fn errors(&self) -> Vec<String> {
        self.read().errors.clone()
    }

    /// The `name` attribute of the primary element.
    pub fn name(&self) -> Option<String> {
        self.shared.doc.attribute(self.element(), "name")
    }

    /// Display name used in messages.
    pub fn label(&self) -> String {
        let config = self.config();
        self.shared
            .doc
            .attribute(self.element(), &config.display_name)
            .unwrap_or_else(|| config.default_label.clone())
    }

    pub(crate) fn label_in(&self, attributes: &Attributes) -> String {
        let config = self.config();
        attributes
            .get(&config.display_name)
            .cloned()
            .unwrap_or_else(|| config.default_label.clone())
    }

    /// Whether the primary element is a checkbox or radio.
    pub fn is_checkable(&self) -> bool {
        matches!(
            self.shared.doc.input_type(self.element()).as_deref(),
            Some("checkbox" | "radio")
        )
    }

    /// Whether this control groups same-name checkables.
    pub fn is_group(&self) -> bool {
        self.is_checkable() && self.name().is_some_and(|n| !n.is_empty())
    }

    /// Whether any member is checked.
    pub fn any_checked(&self) -> bool {
        self.members().into_iter().any(|m| self.shared.doc.checked(m))
    }

    /// Current value: the first checked member's value for groups, the
    /// primary element's value otherwise.
    pub fn value(&self) -> String {
        let doc = &self.shared.doc;
        if self.is_group() {
            return self
                .members()
                .into_iter()
                .find(|m| doc.checked(*m))
                .map(|m| doc.value(m))
                .unwrap_or_default();
        }
        doc.value(self.element())
    }

    /// Disabled, or `fx-validate` is not truthy.
    pub fn is_inactive(&self) -> bool {
        let doc = &self.shared.doc;
        let el = self.element();
        doc.has_attribute(el, "disabled")
            || !truthy(doc.attribute(el, &self.config().validate).as_deref())
    }

    // -------------------------------------------------------------------------
    // Validators
    // -------------------------------------------------------------------------

    /// Add a control-local validator, replacing a local one of the same name.
    /// Shadows a global validator of the same name for this control only.
    pub fn add_validator(&self, validator: Validator) -> Option<Arc<Validator>> {
        let validator = Arc::new(validator);
        let mut state = self.write();
        match state
            .validators
            .iter_mut()
            .find(|v| v.name() == validator.name())
        {
            Some(slot) => Some(std::mem::replace(slot, validator)),
            None => {
                state.validators.push(validator);
                None
            }
        }
    }

    pub fn remove_validator(&self, name: impl Into<ValidatorName>) -> Option<Arc<Validator>> {
        let name = name.into();
        let mut state = self.write();
        let index = state.validators.iter().position(|v| *v.name() == name)?;
        Some(state.validators.remove(index))
    }

    /// Control-local validators.
    pub fn local_validators(&self) -> Vec<Arc<Validator>> {
        self.read().validators.clone()
    }

    /// Global validators with local ones substituted by name, then local-only
    /// validators in insertion order.
    pub fn validators(&self) -> Vec<Arc<Validator>> {
        let local = self.local_validators();
        let mut merged: Vec<Arc<Validator>> = self
            .shared
            .registry
            .validators()
            .into_iter()
            .map(|global| {
                local
                    .iter()
                    .find(|l| l.name() == global.name())
                    .cloned()
                    .unwrap_or(global)
            })
            .collect();

        for l in local {
            if !merged.iter().any(|m| m.name() == l.name()) {
                merged.push(l);
            }
        }
        merged
    }

    /// Attributes whose change re-runs the check.
    pub fn watched_attributes(&self) -> Vec<String> {
        let config = self.config();
        let mut watched: Vec<String> = Vec::new();
        let mut watch = |name: String| {
            if !watched.contains(&name) {
                watched.push(name);
            }
        };

        for validator in self.validators() {
            for attribute in validator.attributes().unwrap_or_default() {
                watch(attribute.clone());
                config.fail_attributes(attribute).for_each(&mut watch);
            }
        }
        watch("disabled".to_string());
        watch(config.validate.clone());
        watch(config.display_name.clone());
        watched
    }

    // -------------------------------------------------------------------------
    // Members
    // -------------------------------------------------------------------------

    /// Add a group member. Returns false if it already was one.
    pub fn add_member(&self, node: NodeId) -> bool {
        {
            let mut state = self.write();
            if state.destroyed || state.members.contains(&node) {
                return false;
            }
            state.members.push(node);
        }

        debug!("[control] {} gained member {node}", self.id());
        self.bind_member(node);
        self.reflect_member(node);
        true
    }

    /// Remove a group member, promoting the next one if it was the primary.
    /// Returns the number of remaining members.
    pub fn remove_member(&self, node: NodeId) -> usize {
        let (promoted, remaining) = {
            let mut state = self.write();
            let Some(index) = state.members.iter().position(|m| *m == node) else {
                return state.members.len();
            };
            state.members.remove(index);
            let promoted = match state.members.first() {
                Some(&next) if state.el == node => {
                    state.el = next;
                    Some(next)
                }
                _ => None,
            };
            (promoted, state.members.len())
        };

        debug!("[control] {} lost member {node} ({remaining} left)", self.id());
        self.unbind_member(node);
        self.clear_member_state(node);
        if promoted.is_some() {
            self.observe_primary();
        }
        remaining
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Begin listening for the `fx-on` events.
    pub fn start(&self) {
        {
            let mut state = self.write();
            if state.started || state.destroyed {
                return;
            }
            state.started = true;
        }

        debug!("[control] {} started", self.id());
        self.unbind_start();
        self.bind_repeat();
        if !self.is_inactive() {
            self.reflect(&self.config().started_state, Some("true"));
        }
    }

    /// Detach listeners and the observer, clear state attributes and revoke
    /// any running check.
    pub fn destroy(&self) {
        let observer = {
            let mut state = self.write();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.checking = false;
            state.observer.take()
        };

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(observer) = observer {
            self.shared.doc.disconnect(observer);
        }
        self.unbind_start();
        self.unbind_repeat();
        self.clear_state();

        if let Ok(mut driver) = self.shared.driver.lock() {
            if let Some(driver) = driver.take() {
                driver.abort();
            }
        }
        debug!("[control] {} destroyed", self.id());
    }

    // -------------------------------------------------------------------------
    // Reflected state
    // -------------------------------------------------------------------------

    /// Set (or with `None` remove) an attribute on every member.
    fn reflect(&self, name: &str, value: Option<&str>) {
        let doc = &self.shared.doc;
        for member in self.members() {
            let _ = match value {
                Some(value) => doc.set_attribute(member, name, value),
                None => doc.remove_attribute(member, name),
            };
        }
    }

    fn reflect_valid(&self, valid: bool) {
        let config = self.config();
        self.reflect(&config.valid_state, Some(bool_str(valid)));
        if config.aria {
            self.reflect("aria-invalid", Some(bool_str(!valid)));
        }
    }

    fn reflect_checking(&self, checking: bool) {
        self.reflect(&self.config().checking_state, Some(bool_str(checking)));
    }

    fn reflect_initial(&self) {
        if self.is_inactive() {
            return;
        }
        let (valid, checking) = {
            let state = self.read();
            (state.valid, state.checking)
        };
        self.reflect_valid(valid);
        self.reflect_checking(checking);
    }

    /// Copy the current state attributes onto a new member.
    fn reflect_member(&self, node: NodeId) {
        let el = self.element();
        if el == node {
            return;
        }
        let doc = &self.shared.doc;
        for name in self.state_attributes() {
            if let Some(value) = doc.attribute(el, &name) {
                let _ = doc.set_attribute(node, &name, &value);
            }
        }
    }

    fn state_attributes(&self) -> Vec<String> {
        let config = self.config();
        let mut names = vec![
            config.valid_state.clone(),
            config.checking_state.clone(),
            config.started_state.clone(),
        ];
        if config.aria {
            names.push("aria-invalid".to_string());
        }
        names
    }

    fn clear_member_state(&self, node: NodeId) {
        for name in self.state_attributes() {
            let _ = self.shared.doc.remove_attribute(node, &name);
        }
    }

    fn clear_state(&self) {
        for name in self.state_attributes() {
            self.reflect(&name, None);
        }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
