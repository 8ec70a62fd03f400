use std::sync::{Arc, Mutex};

use formdom::{ChangeNotifier, Document, DomError, Element, Mutation, ObserveOptions};

fn signup() -> Element {
    Element::form()
        .attr("fx-form", "")
        .child(Element::input("text").name("user").value("ada"))
        .child(Element::input("radio").name("plan").attr("value", "free"))
        .child(Element::input("radio").name("plan").attr("value", "pro"))
        .child(Element::ul().attr("fx-errors-for", "user"))
        .child(Element::button("submit"))
}

fn record(doc: &Document, node: formdom::NodeId, options: ObserveOptions) -> Arc<Mutex<Vec<Mutation>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    doc.observe(
        node,
        options,
        Arc::new(move |m: &Mutation| sink.lock().unwrap().push(m.clone())),
    );
    seen
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_insert_builds_subtree() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();

    assert_eq!(doc.tag(form).as_deref(), Some("form"));
    assert_eq!(doc.control_elements(form).len(), 3);
    assert_eq!(doc.elements_by_tag(form, "ul").len(), 1);
    assert!(doc.is_connected(form));

    let user = doc.control_elements(form)[0];
    assert_eq!(doc.value(user), "ada");
    assert_eq!(doc.form_of(user), Some(form));
}

#[test]
fn test_detach_disconnects_descendants() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();
    let user = doc.control_elements(form)[0];

    doc.detach(form).unwrap();
    assert!(!doc.is_connected(form));
    assert!(!doc.is_connected(user));
    assert!(doc.contains(form, user));
}

#[test]
fn test_root_cannot_be_detached() {
    let doc = Document::new();
    assert_eq!(doc.detach(doc.root()), Err(DomError::DetachRoot));
}

#[test]
fn test_query_attribute_by_value() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();

    assert_eq!(doc.query_attribute(form, "fx-errors-for", Some("user")).len(), 1);
    assert!(doc.query_attribute(form, "fx-errors-for", Some("plan")).is_empty());
    assert_eq!(doc.query_attribute(doc.root(), "fx-form", None), vec![form]);
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_input_fires_input_and_change() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();
    let user = doc.control_elements(form)[0];

    let events = Arc::new(Mutex::new(Vec::new()));
    for name in ["input", "change"] {
        let sink = Arc::clone(&events);
        doc.add_listener(user, name, move |ev| sink.lock().unwrap().push(ev.name().to_string()));
    }

    doc.input(user, "grace");
    assert_eq!(doc.value(user), "grace");
    assert_eq!(*events.lock().unwrap(), vec!["input", "change"]);
}

#[test]
fn test_radio_click_unchecks_peers() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();
    let controls = doc.control_elements(form);
    let (free, pro) = (controls[1], controls[2]);

    doc.click(free);
    assert!(doc.checked(free));
    doc.click(pro);
    assert!(doc.checked(pro));
    assert!(!doc.checked(free));
}

#[test]
fn test_prevented_submit_is_not_recorded() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();

    let id = doc.add_listener(form, "submit", |ev| ev.prevent_default());
    assert!(!doc.request_submit(form));
    assert_eq!(doc.submissions(form), 0);

    assert!(doc.remove_listener(id));
    let button = doc.elements_by_tag(form, "button")[0];
    doc.click(button);
    assert_eq!(doc.submissions(form), 1);
}

// ============================================================================
// Change notification
// ============================================================================

#[test]
fn test_attribute_mutations_are_reported_once_per_change() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();
    let user = doc.control_elements(form)[0];
    let seen = record(&doc, user, ObserveOptions::attributes());

    doc.set_attribute(user, "required", "").unwrap();
    doc.set_attribute(user, "required", "").unwrap();
    doc.remove_attribute(user, "required").unwrap();
    doc.remove_attribute(user, "required").unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0],
        Mutation::Attribute {
            target: user,
            name: "required".to_string()
        }
    );
}

#[test]
fn test_subtree_observer_sees_nested_changes() {
    let doc = Document::new();
    let form = doc.insert(doc.root(), signup()).unwrap();
    let seen = record(
        &doc,
        form,
        ObserveOptions::child_list().with_attributes().subtree().filter(["type"]),
    );

    let user = doc.control_elements(form)[0];
    doc.set_attribute(user, "type", "radio").unwrap();
    doc.set_attribute(user, "fx-name", "User").unwrap();
    let extra = doc.insert(form, Element::input("text").name("extra")).unwrap();
    doc.detach(extra).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(matches!(&seen[1], Mutation::ChildList { added, .. } if added == &vec![extra]));
    assert!(matches!(&seen[2], Mutation::ChildList { removed, .. } if removed == &vec![extra]));
}

#[test]
fn test_disconnect_stops_delivery() {
    let doc = Document::new();
    let seen = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&seen);
    let id = doc.observe(
        doc.root(),
        ObserveOptions::child_list(),
        Arc::new(move |_: &Mutation| *sink.lock().unwrap() += 1),
    );

    doc.insert(doc.root(), Element::div()).unwrap();
    assert!(doc.disconnect(id));
    doc.insert(doc.root(), Element::div()).unwrap();

    assert_eq!(*seen.lock().unwrap(), 1);
    assert_eq!(doc.observer_count(), 0);
}
