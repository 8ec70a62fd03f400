//! Shared document handle.

mod tree;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace};

pub use tree::NodeId;
use tree::Tree;

use crate::element::{Element, CONTROL_TAGS};
use crate::error::DomError;
use crate::event::{Event, Listener, ListenerId, Listeners};
use crate::observe::{ChangeNotifier, Mutation, MutationCallback, ObserveOptions, ObserverId, Observers};

struct Shared {
    tree: RwLock<Tree>,
    listeners: RwLock<Listeners>,
    observers: RwLock<Observers>,
    submissions: Mutex<HashMap<NodeId, usize>>,
}

/// A document: a tree of nodes plus its event listeners and observers.
///
/// `Document` is a cheap, cloneable handle. All clones see the same tree.
///
/// # Example
///
/// ```
/// use formdom::{Document, Element};
///
/// let doc = Document::new();
/// let form = doc
///     .insert(doc.root(), Element::form().child(Element::input("text").name("email")))
///     .unwrap();
/// let input = doc.control_elements(form)[0];
/// doc.input(input, "a@b.co");
/// assert_eq!(doc.value(input), "a@b.co");
/// ```
#[derive(Clone)]
pub struct Document {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.read();
        f.debug_struct("Document")
            .field("nodes", &tree.descendants(tree.root()).len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `body` root.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tree: RwLock::new(Tree::new()),
                listeners: RwLock::new(Listeners::default()),
                observers: RwLock::new(Observers::default()),
                submissions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether two handles point at the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.shared
            .tree
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.shared
            .tree
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn root(&self) -> NodeId {
        self.read().root()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Build `el` and append it under `parent`.
    pub fn insert(&self, parent: NodeId, el: Element) -> Result<NodeId, DomError> {
        let id = {
            let mut tree = self.write();
            tree.get(parent)?;
            let id = tree.alloc(&el);
            tree.append(parent, id)?;
            id
        };

        self.notify(Mutation::ChildList {
            target: parent,
            added: vec![id],
            removed: Vec::new(),
        });
        Ok(id)
    }

    /// Build `el` without attaching it.
    pub fn create(&self, el: Element) -> NodeId {
        self.write().alloc(&el)
    }

    /// Append an existing node under `parent`, moving it if it is attached.
    pub fn append(&self, parent: NodeId, node: NodeId) -> Result<(), DomError> {
        let previous = self.write().append(parent, node)?;

        if let Some(previous) = previous {
            self.notify(Mutation::ChildList {
                target: previous,
                added: Vec::new(),
                removed: vec![node],
            });
        }
        self.notify(Mutation::ChildList {
            target: parent,
            added: vec![node],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Remove a node from its parent.
    pub fn detach(&self, node: NodeId) -> Result<(), DomError> {
        let previous = self.write().detach(node)?;

        if let Some(previous) = previous {
            self.notify(Mutation::ChildList {
                target: previous,
                added: Vec::new(),
                removed: vec![node],
            });
        }
        Ok(())
    }

    /// Remove all children of `node`.
    pub fn clear_children(&self, node: NodeId) -> Result<(), DomError> {
        let removed = {
            let mut tree = self.write();
            let children = tree.get(node)?.children.clone();
            for child in &children {
                tree.detach(*child)?;
            }
            children
        };

        if !removed.is_empty() {
            self.notify(Mutation::ChildList {
                target: node,
                added: Vec::new(),
                removed,
            });
        }
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.read().get(node).ok().and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.read()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Descendants of `node` in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.read().descendants(node)
    }

    /// Whether `node` is attached to the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.read();
        tree.is_inclusive_ancestor(tree.root(), node)
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.read().is_inclusive_ancestor(ancestor, node)
    }

    /// Closest inclusive ancestor with the given tag.
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let tree = self.read();
        tree.inclusive_ancestors(node)
            .into_iter()
            .find(|id| tree.get(*id).is_ok_and(|n| n.tag == tag))
    }

    /// The form owning `node`, if any.
    pub fn form_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).and_then(|p| self.closest(p, "form"))
    }

    /// Descendant inputs, textareas and selects of `root`, in document order.
    pub fn control_elements(&self, root: NodeId) -> Vec<NodeId> {
        let tree = self.read();
        tree.descendants(root)
            .into_iter()
            .filter(|id| tree.get(*id).is_ok_and(|n| CONTROL_TAGS.contains(&n.tag.as_str())))
            .collect()
    }

    /// Descendants of `root` with the given tag.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let tree = self.read();
        tree.descendants(root)
            .into_iter()
            .filter(|id| tree.get(*id).is_ok_and(|n| n.tag == tag))
            .collect()
    }

    /// Descendants of `root` carrying attribute `name`, optionally with an exact value.
    pub fn query_attribute(&self, root: NodeId, name: &str, value: Option<&str>) -> Vec<NodeId> {
        let tree = self.read();
        tree.descendants(root)
            .into_iter()
            .filter(|id| {
                tree.get(*id)
                    .ok()
                    .and_then(|n| n.attribute(name))
                    .is_some_and(|v| value.is_none_or(|expected| v == expected))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Node data
    // -------------------------------------------------------------------------

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.read().get(node).ok().map(|n| n.tag.clone())
    }

    pub fn is_control(&self, node: NodeId) -> bool {
        self.read()
            .get(node)
            .is_ok_and(|n| CONTROL_TAGS.contains(&n.tag.as_str()))
    }

    /// The `type` of an input or button, lowercased, with the HTML defaults
    /// (`"text"`, `"submit"`) when missing. Other tags report their tag name.
    pub fn input_type(&self, node: NodeId) -> Option<String> {
        let tree = self.read();
        let data = tree.get(node).ok()?;
        let fallback = match data.tag.as_str() {
            "input" => "text",
            "button" => "submit",
            other => return Some(other.to_string()),
        };
        Some(
            data.attribute("type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| fallback.to_string()),
        )
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.read()
            .get(node)
            .ok()
            .and_then(|n| n.attribute(name))
            .map(str::to_string)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.read()
            .get(node)
            .is_ok_and(|n| n.attribute(name).is_some())
    }

    /// Snapshot of all attributes of `node`.
    pub fn attributes(&self, node: NodeId) -> HashMap<String, String> {
        self.read()
            .get(node)
            .map(|n| n.attributes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let changed = {
            let mut tree = self.write();
            let data = tree.get_mut(node)?;
            match data.attributes.iter_mut().find(|(n, _)| n == name) {
                Some(slot) if slot.1 == value => false,
                Some(slot) => {
                    slot.1 = value.to_string();
                    true
                }
                None => {
                    data.attributes.push((name.to_string(), value.to_string()));
                    true
                }
            }
        };

        if changed {
            self.notify(Mutation::Attribute {
                target: node,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        let removed = {
            let mut tree = self.write();
            let data = tree.get_mut(node)?;
            let before = data.attributes.len();
            data.attributes.retain(|(n, _)| n != name);
            data.attributes.len() != before
        };

        if removed {
            self.notify(Mutation::Attribute {
                target: node,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Current value of a control. Empty for unknown nodes.
    pub fn value(&self, node: NodeId) -> String {
        self.read()
            .get(node)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    pub fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.write().get_mut(node)?.value = value.to_string();
        Ok(())
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.read().get(node).is_ok_and(|n| n.checked)
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) -> Result<(), DomError> {
        self.write().get_mut(node)?.checked = checked;
        Ok(())
    }

    /// Text of `node` and all of its descendants.
    pub fn text(&self, node: NodeId) -> String {
        self.read().text_content(node)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn add_listener<F>(&self, node: NodeId, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let callback: Listener = Arc::new(callback);
        self.shared
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(node, event, callback)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
    }

    /// Number of listeners attached to `node`.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.shared
            .listeners
            .read()
            .map(|l| l.count(node))
            .unwrap_or(0)
    }

    /// Dispatch `event` at `node`.
    ///
    /// Returns `true` if no listener prevented the default action.
    pub fn dispatch(&self, node: NodeId, event: &str) -> bool {
        let callbacks = self
            .shared
            .listeners
            .read()
            .map(|l| l.matching(node, event))
            .unwrap_or_default();

        trace!("[dom] dispatch {event} at {node} ({} listeners)", callbacks.len());

        let ev = Event::new(event, node);
        for callback in callbacks {
            callback(&ev);
        }
        !ev.default_prevented()
    }

    /// Type into a control: set its value, then fire `input` and `change`.
    pub fn input(&self, node: NodeId, value: &str) {
        if self.set_value(node, value).is_err() {
            return;
        }
        self.dispatch(node, "input");
        self.dispatch(node, "change");
    }

    /// Click a node.
    ///
    /// Checkboxes toggle, radios become checked and uncheck same-name peers
    /// in the same form, submit buttons request submission of their form.
    pub fn click(&self, node: NodeId) {
        match self.input_type(node).as_deref() {
            Some("checkbox") => {
                let checked = !self.checked(node);
                let _ = self.set_checked(node, checked);
            }
            Some("radio") => {
                self.select_radio(node);
            }
            Some("submit") => {
                self.dispatch(node, "click");
                if let Some(form) = self.closest(node, "form") {
                    self.request_submit(form);
                }
                return;
            }
            _ => {
                self.dispatch(node, "click");
                return;
            }
        }

        self.dispatch(node, "click");
        self.dispatch(node, "input");
        self.dispatch(node, "change");
    }

    fn select_radio(&self, node: NodeId) {
        let name = self.attribute(node, "name");
        let scope = self.form_of(node).unwrap_or_else(|| self.root());

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            for peer in self.control_elements(scope) {
                if peer != node
                    && self.input_type(peer).as_deref() == Some("radio")
                    && self.attribute(peer, "name").as_deref() == Some(name.as_str())
                {
                    let _ = self.set_checked(peer, false);
                }
            }
        }
        let _ = self.set_checked(node, true);
    }

    /// Fire a cancelable `submit` at `form`; record a submission if nobody
    /// prevented it. Returns whether the form was submitted.
    pub fn request_submit(&self, form: NodeId) -> bool {
        let proceed = self.dispatch(form, "submit");
        if proceed {
            debug!("[dom] form {form} submitted");
            if let Ok(mut submissions) = self.shared.submissions.lock() {
                *submissions.entry(form).or_insert(0) += 1;
            }
        } else {
            debug!("[dom] submission of {form} prevented");
        }
        proceed
    }

    /// Number of completed submissions of `form`.
    pub fn submissions(&self, form: NodeId) -> usize {
        self.shared
            .submissions
            .lock()
            .map(|s| s.get(&form).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Change notification
    // -------------------------------------------------------------------------

    fn notify(&self, mutation: Mutation) {
        let ancestors = self.read().inclusive_ancestors(mutation.target());
        let callbacks = self
            .shared
            .observers
            .read()
            .map(|o| o.matching(&ancestors, &mutation))
            .unwrap_or_default();

        trace!("[dom] {mutation:?} -> {} observers", callbacks.len());

        for callback in callbacks {
            callback(&mutation);
        }
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.read().map(|o| o.len()).unwrap_or(0)
    }
}

impl ChangeNotifier for Document {
    fn observe(&self, node: NodeId, options: ObserveOptions, callback: MutationCallback) -> ObserverId {
        self.shared
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(node, options, callback)
    }

    fn disconnect(&self, id: ObserverId) -> bool {
        self.shared
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
    }
}
