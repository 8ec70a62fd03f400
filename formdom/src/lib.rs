//! Minimal in-memory document model.
//!
//! `formdom` provides just enough of a DOM for form tooling: a node tree with
//! attributes and control state, non-bubbling events with cancelable default
//! actions, native form submission bookkeeping, and attribute/child-list
//! change notification.

pub mod document;
pub mod element;
pub mod error;
pub mod event;
pub mod observe;

pub use document::{Document, NodeId};
pub use element::{Element, CONTROL_TAGS};
pub use error::DomError;
pub use event::{Event, Listener, ListenerId};
pub use observe::{ChangeNotifier, Mutation, MutationCallback, ObserveOptions, ObserverId};
