use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::NodeId;

/// An event dispatched at a single node. Events do not bubble.
#[derive(Debug)]
pub struct Event {
    name: String,
    target: NodeId,
    default_prevented: AtomicBool,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            default_prevented: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Cancel the default action (e.g. native form submission).
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }
}

/// Event callback.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`Document::add_listener`](crate::Document::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    node: NodeId,
    event: String,
    callback: Listener,
}

/// Listener table of a document.
#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    entries: Vec<Entry>,
}

impl Listeners {
    pub fn add(&mut self, node: NodeId, event: &str, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push(Entry {
            id,
            node,
            event: event.to_string(),
            callback,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Callbacks registered for `event` on `node`, in registration order.
    pub fn matching(&self, node: NodeId, event: &str) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|e| e.node == node && e.event == event)
            .map(|e| Arc::clone(&e.callback))
            .collect()
    }

    pub fn count(&self, node: NodeId) -> usize {
        self.entries.iter().filter(|e| e.node == node).count()
    }
}
