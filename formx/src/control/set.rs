//! Keeping a set of controls in step with the control elements of a scope.

use formdom::{Document, Mutation, NodeId};
use log::debug;

use super::Control;
use crate::error::Error;
use crate::registry::Registry;

/// Which control an element belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum GroupKey {
    Solo(NodeId),
    /// Same-name radios or checkboxes.
    Group { kind: String, name: String },
}

impl GroupKey {
    pub fn of(doc: &Document, node: NodeId) -> Self {
        if doc.tag(node).as_deref() != Some("input") {
            return Self::Solo(node);
        }

        let kind = doc.input_type(node).filter(|k| k == "radio" || k == "checkbox");
        let name = doc.attribute(node, "name").filter(|n| !n.is_empty());
        match (kind, name) {
            (Some(kind), Some(name)) => Self::Group { kind, name },
            _ => Self::Solo(node),
        }
    }
}

struct Entry {
    key: GroupKey,
    control: Control,
}

/// Controls of one scope (a form, or the loose controls of a document).
pub(crate) struct ControlSet {
    doc: Document,
    registry: Registry,
    entries: Vec<Entry>,
}

impl ControlSet {
    pub fn new(doc: &Document, registry: &Registry) -> Self {
        Self {
            doc: doc.clone(),
            registry: registry.clone(),
            entries: Vec::new(),
        }
    }

    /// Reconcile with `elements`, the scope's control elements in document order.
    ///
    /// Members that left the scope or changed group are removed (destroying
    /// controls left empty); new elements join their group or get a control.
    pub fn sync(&mut self, elements: &[NodeId]) -> Result<(), Error> {
        let doc = &self.doc;

        self.entries.retain(|entry| {
            for member in entry.control.members() {
                if !elements.contains(&member) || GroupKey::of(doc, member) != entry.key {
                    if entry.control.remove_member(member) == 0 {
                        entry.control.destroy();
                        return false;
                    }
                }
            }
            true
        });

        for &node in elements {
            if self.entries.iter().any(|e| e.control.members().contains(&node)) {
                continue;
            }

            let key = GroupKey::of(doc, node);
            if let GroupKey::Group { .. } = key {
                if let Some(entry) = self.entries.iter().find(|e| e.key == key) {
                    entry.control.add_member(node);
                    continue;
                }
            }

            debug!("[controls] new control for {node} ({key:?})");
            let control = Control::new(doc, node, &self.registry)?;
            self.entries.push(Entry { key, control });
        }

        self.entries.sort_by_key(|e| {
            let el = e.control.element();
            elements.iter().position(|n| *n == el)
        });
        Ok(())
    }

    /// Controls in document order of their primary elements.
    pub fn controls(&self) -> Vec<Control> {
        self.entries.iter().map(|e| e.control.clone()).collect()
    }

    /// The control that `node` is a member of.
    pub fn find(&self, node: NodeId) -> Option<Control> {
        self.entries
            .iter()
            .find(|e| e.control.members().contains(&node))
            .map(|e| e.control.clone())
    }

    pub fn destroy_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.control.destroy();
        }
    }
}

/// Whether a mutation can change which controls or forms exist.
pub(crate) fn affects_controls(doc: &Document, mutation: &Mutation) -> bool {
    match mutation {
        Mutation::Attribute { .. } => true,
        Mutation::ChildList { added, removed, .. } => added.iter().chain(removed).any(|&node| {
            doc.is_control(node)
                || doc.tag(node).as_deref() == Some("form")
                || !doc.control_elements(node).is_empty()
                || !doc.elements_by_tag(node, "form").is_empty()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdom::Element;

    #[test]
    fn group_keys() {
        let doc = Document::new();
        let root = doc.root();
        let radio = doc.insert(root, Element::input("radio").name("size")).unwrap();
        let unnamed = doc.insert(root, Element::input("checkbox")).unwrap();
        let text = doc.insert(root, Element::input("text").name("size")).unwrap();

        assert_eq!(
            GroupKey::of(&doc, radio),
            GroupKey::Group {
                kind: "radio".to_string(),
                name: "size".to_string()
            }
        );
        assert_eq!(GroupKey::of(&doc, unnamed), GroupKey::Solo(unnamed));
        assert_eq!(GroupKey::of(&doc, text), GroupKey::Solo(text));
    }

    #[test]
    fn error_container_writes_do_not_affect_controls() {
        let doc = Document::new();
        let list = doc.insert(doc.root(), Element::ul()).unwrap();
        let item = doc.insert(list, Element::li("oops")).unwrap();
        let input = doc.insert(doc.root(), Element::input("text")).unwrap();

        let added = |node| Mutation::ChildList {
            target: list,
            added: vec![node],
            removed: Vec::new(),
        };
        assert!(!affects_controls(&doc, &added(item)));
        assert!(affects_controls(&doc, &added(input)));
    }

    #[tokio::test]
    async fn sync_groups_and_regroups() {
        let doc = Document::new();
        let registry = Registry::with_defaults();
        let form = doc
            .insert(
                doc.root(),
                Element::form().children([
                    Element::input("radio").name("size").value("s"),
                    Element::input("radio").name("size").value("m"),
                    Element::input("text").name("note"),
                ]),
            )
            .unwrap();
        let elements = doc.control_elements(form);
        let mut set = ControlSet::new(&doc, &registry);
        set.sync(&elements).unwrap();

        let controls = set.controls();
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].members(), vec![elements[0], elements[1]]);
        assert!(set.find(elements[1]).unwrap().ptr_eq(&controls[0]));

        // A member leaving its group gets its own control.
        doc.set_attribute(elements[1], "type", "text").unwrap();
        set.sync(&elements).unwrap();
        let controls = set.controls();
        assert_eq!(controls.len(), 3);
        assert_eq!(controls[0].members(), vec![elements[0]]);
        assert_eq!(controls[1].element(), elements[1]);

        // A control left without members is destroyed.
        set.sync(&elements[1..]).unwrap();
        assert_eq!(set.controls().len(), 2);
        assert!(set.find(elements[0]).is_none());

        set.destroy_all();
        assert!(set.controls().is_empty());
    }
}
