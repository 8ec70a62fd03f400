//! Change notification.
//!
//! Observers register interest in a node (optionally its whole subtree) and
//! receive one [`Mutation`] per change. Delivery happens synchronously after
//! the document lock is released, so callbacks may read the document. Writes
//! that leave a value unchanged are not reported.

use std::sync::Arc;

use crate::NodeId;

/// A single reported change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// An attribute was set, changed or removed.
    Attribute { target: NodeId, name: String },
    /// Children were added to or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
}

impl Mutation {
    pub fn target(&self) -> NodeId {
        match self {
            Self::Attribute { target, .. } | Self::ChildList { target, .. } => *target,
        }
    }
}

/// What an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub attributes: bool,
    pub child_list: bool,
    pub subtree: bool,
    /// Restrict attribute mutations to these names.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Observe attribute changes.
    pub fn attributes() -> Self {
        Self {
            attributes: true,
            ..Default::default()
        }
    }

    /// Observe child additions/removals.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self) -> Self {
        self.attributes = true;
        self
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a mutation at a node with the given inclusive ancestors matches.
    pub(crate) fn matches(&self, observed: NodeId, ancestors: &[NodeId], mutation: &Mutation) -> bool {
        let in_scope = if self.subtree {
            ancestors.contains(&observed)
        } else {
            mutation.target() == observed
        };
        if !in_scope {
            return false;
        }

        match mutation {
            Mutation::Attribute { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|filter| filter.iter().any(|f| f == name))
            }
            Mutation::ChildList { .. } => self.child_list,
        }
    }
}

/// Mutation callback.
pub type MutationCallback = Arc<dyn Fn(&Mutation) + Send + Sync>;

/// Handle returned by [`ChangeNotifier::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Attribute-name-granular, at-least-once change delivery.
pub trait ChangeNotifier {
    /// Start observing `node`.
    fn observe(&self, node: NodeId, options: ObserveOptions, callback: MutationCallback) -> ObserverId;

    /// Stop an observer. Returns false if it was already gone.
    fn disconnect(&self, id: ObserverId) -> bool;
}

struct Entry {
    id: ObserverId,
    node: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
}

/// Observer table of a document.
#[derive(Default)]
pub(crate) struct Observers {
    next: u64,
    entries: Vec<Entry>,
}

impl Observers {
    pub fn add(&mut self, node: NodeId, options: ObserveOptions, callback: MutationCallback) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.entries.push(Entry {
            id,
            node,
            options,
            callback,
        });
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn matching(&self, ancestors: &[NodeId], mutation: &Mutation) -> Vec<MutationCallback> {
        self.entries
            .iter()
            .filter(|e| e.options.matches(e.node, ancestors, mutation))
            .map(|e| Arc::clone(&e.callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
