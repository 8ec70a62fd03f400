//! Event and attribute wiring.
//!
//! Document callbacks run synchronously inside the document, so they only
//! post a [`Signal`]. A per-control driver task consumes the signals and
//! spawns checks.

use std::sync::{Arc, Weak};

use formdom::{ChangeNotifier, Event, ListenerId, Mutation, NodeId, ObserveOptions};
use log::{debug, error, trace};
use tokio::sync::mpsc;

use super::{Control, ControlShared};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    /// A start event fired.
    Start,
    /// A repeat event fired.
    Check,
    /// An attribute of the primary element changed.
    Attribute(String),
}

pub(crate) async fn drive(control: Weak<ControlShared>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        let Some(shared) = control.upgrade() else {
            break;
        };
        let control = Control { shared };
        if control.is_destroyed() {
            break;
        }

        trace!("[control] {} received {signal:?}", control.id());
        match signal {
            Signal::Start => {
                control.start();
                control.spawn_check();
            }
            Signal::Check => control.spawn_check(),
            Signal::Attribute(name) => control.attribute_changed(&name),
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Start,
    Repeat,
}

impl Control {
    /// Run a check in the background, logging configuration errors.
    pub(crate) fn spawn_check(&self) {
        let control = self.clone();
        tokio::spawn(async move {
            if let Err(e) = control.check().await {
                error!("[control] {}: {e}", control.id());
            }
        });
    }

    fn attribute_changed(&self, name: &str) {
        let config = self.config();
        if name == config.on {
            self.rebind(Kind::Repeat);
        } else if name == config.start_on {
            self.rebind(Kind::Start);
        } else if self.watched_attributes().iter().any(|w| w == name) {
            debug!("[control] {} watched attribute `{name}` changed", self.id());
            self.spawn_check();
        }
    }

    /// Observe the primary element's attributes, replacing a previous observer.
    pub(super) fn observe_primary(&self) {
        let el = self.element();
        let signals = self.shared.signals.clone();
        let observer = self.shared.doc.observe(
            el,
            ObserveOptions::attributes(),
            Arc::new(move |mutation: &Mutation| {
                if let Mutation::Attribute { name, .. } = mutation {
                    let _ = signals.send(Signal::Attribute(name.clone()));
                }
            }),
        );

        let previous = self.write().observer.replace(observer);
        if let Some(previous) = previous {
            self.shared.doc.disconnect(previous);
        }
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    fn listen(&self, node: NodeId, event: &str, kind: Kind) -> ListenerId {
        let signals = self.shared.signals.clone();
        let signal = match kind {
            Kind::Start => Signal::Start,
            Kind::Repeat => Signal::Check,
        };
        self.shared.doc.add_listener(node, event, move |_: &Event| {
            let _ = signals.send(signal.clone());
        })
    }

    fn bind(&self, kind: Kind, nodes: &[NodeId]) {
        let events = {
            let state = self.read();
            match kind {
                Kind::Start => state.start_events.clone(),
                Kind::Repeat => state.repeat_events.clone(),
            }
        };

        let ids: Vec<_> = nodes
            .iter()
            .flat_map(|node| events.iter().map(move |event| (*node, event)))
            .map(|(node, event)| (node, self.listen(node, event, kind)))
            .collect();

        let mut state = self.write();
        match kind {
            Kind::Start => state.start_listeners.extend(ids),
            Kind::Repeat => state.repeat_listeners.extend(ids),
        }
    }

    /// Remove listeners of `kind`, optionally only those on `node`.
    fn unbind(&self, kind: Kind, node: Option<NodeId>) {
        let removed = {
            let mut state = self.write();
            let listeners = match kind {
                Kind::Start => &mut state.start_listeners,
                Kind::Repeat => &mut state.repeat_listeners,
            };
            let (removed, kept): (Vec<_>, Vec<_>) = listeners
                .drain(..)
                .partition(|(n, _)| node.is_none_or(|only| *n == only));
            *listeners = kept;
            removed
        };

        for (_, id) in removed {
            self.shared.doc.remove_listener(id);
        }
    }

    pub(super) fn bind_start(&self) {
        let (started, members) = {
            let state = self.read();
            (state.started, state.members.clone())
        };
        if !started {
            self.bind(Kind::Start, &members);
        }
    }

    pub(super) fn unbind_start(&self) {
        self.unbind(Kind::Start, None);
    }

    pub(super) fn bind_repeat(&self) {
        let (started, members) = {
            let state = self.read();
            (state.started, state.members.clone())
        };
        if started {
            self.bind(Kind::Repeat, &members);
        }
    }

    pub(super) fn unbind_repeat(&self) {
        self.unbind(Kind::Repeat, None);
    }

    pub(super) fn bind_member(&self, node: NodeId) {
        let kind = if self.started() { Kind::Repeat } else { Kind::Start };
        self.bind(kind, &[node]);
    }

    pub(super) fn unbind_member(&self, node: NodeId) {
        self.unbind(Kind::Start, Some(node));
        self.unbind(Kind::Repeat, Some(node));
    }

    /// Re-read the event list of `kind` from the primary element and rebind.
    fn rebind(&self, kind: Kind) {
        let config = self.config();
        let el = self.element();
        let attribute = match kind {
            Kind::Start => &config.start_on,
            Kind::Repeat => &config.on,
        };
        let events = config.split_multi(self.shared.doc.attribute(el, attribute).as_deref());
        debug!("[control] {} rebinding {attribute} to {events:?}", self.id());

        self.unbind(kind, None);
        {
            let mut state = self.write();
            match kind {
                Kind::Start => state.start_events = events,
                Kind::Repeat => state.repeat_events = events,
            }
        }
        match kind {
            Kind::Start => self.bind_start(),
            Kind::Repeat => self.bind_repeat(),
        }
    }
}
