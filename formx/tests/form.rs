mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use formdom::{Document, Element, NodeId};
use formx::{ConfigError, ControlId, Error, Form, Registry, Validator, Validity};

use common::{field, init_logger, mount, rendered, settle, sleep_ms};

fn signup() -> Element {
    Element::form().flag("fx-validate").children([
        field("user").attr("fx-name", "User").flag("required"),
        Element::ul().attr("fx-errors-for", "user"),
        field("email")
            .attr("fx-name", "Email")
            .attr("preset", "email")
            .value("jane@example.com"),
        Element::input("radio")
            .name("plan")
            .value("free")
            .flag("fx-validate")
            .flag("required")
            .attr("fx-name", "Plan"),
        Element::input("radio").name("plan").value("pro"),
        Element::button("submit"),
    ])
}

fn find(doc: &Document, root: NodeId, name: &str) -> NodeId {
    doc.query_attribute(root, "name", Some(name))[0]
}

// ============================================================================
// Construction
// ============================================================================

#[tokio::test]
async fn test_form_groups_controls() {
    init_logger();
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    let controls = form.controls();
    assert_eq!(controls.len(), 3);
    assert_eq!(controls[2].members().len(), 2);
    assert!(controls[2].is_group());

    let radios = doc.query_attribute(el, "name", Some("plan"));
    assert!(form.control(radios[1]).unwrap().ptr_eq(&controls[2]));
}

#[tokio::test]
async fn test_form_requires_a_form_element() {
    let doc = Document::new();
    let node = mount(&doc, Element::div());
    assert!(matches!(
        Form::new(&doc, node, &Registry::with_defaults()),
        Err(Error::NotAForm(n)) if n == node
    ));
}

// ============================================================================
// Checking
// ============================================================================

#[tokio::test]
async fn test_form_check_aggregates_controls() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    assert!(!form.check().await.unwrap());
    assert!(!form.valid());

    let report = form.report();
    assert_eq!(report.messages(), vec!["User is required", "Plan is required"]);
    assert_eq!(report.errors()[0].field_name, "user");
    assert_eq!(report.first_invalid_node(), Some(find(&doc, el, "user")));

    doc.set_value(find(&doc, el, "user"), "jane").unwrap();
    let radios = doc.query_attribute(el, "name", Some("plan"));
    doc.click(radios[1]);
    assert!(form.check().await.unwrap());
    assert!(form.valid());
    assert!(form.report().is_valid());
}

#[tokio::test]
async fn test_group_required_follows_any_checked_peer() {
    let doc = Document::new();
    let el = mount(
        &doc,
        Element::form().flag("fx-validate").children([
            Element::input("radio")
                .name("size")
                .value("s")
                .flag("fx-validate")
                .flag("required"),
            Element::input("radio").name("size").value("m"),
            Element::input("radio").name("size").value("l"),
            Element::input("checkbox")
                .name("topics")
                .value("rust")
                .flag("fx-validate")
                .flag("required"),
            Element::input("checkbox").name("topics").value("web"),
            Element::input("checkbox").name("topics").value("db"),
        ]),
    );
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    let sizes = doc.query_attribute(el, "name", Some("size"));
    let topics = doc.query_attribute(el, "name", Some("topics"));
    let radios = form.control(sizes[0]).unwrap();
    let boxes = form.control(topics[0]).unwrap();
    assert_eq!(radios.members().len(), 3);
    assert_eq!(boxes.members().len(), 3);

    assert!(!form.check().await.unwrap());
    assert!(!radios.valid());
    assert!(!boxes.valid());

    // Any one peer satisfies the group, whichever it is.
    for size in [sizes[2], sizes[1]] {
        doc.click(size);
        assert!(radios.check().await.unwrap());
    }
    doc.click(topics[1]);
    doc.click(topics[2]);
    assert!(boxes.check().await.unwrap());
    assert!(form.check().await.unwrap());

    // Unchecking every box makes the group invalid again.
    doc.click(topics[1]);
    assert!(boxes.check().await.unwrap());
    doc.click(topics[2]);
    assert!(!boxes.check().await.unwrap());
    assert_eq!(boxes.errors(), vec!["Field is required"]);
    assert!(!form.check().await.unwrap());
}

#[tokio::test]
async fn test_form_check_runs_each_control_once() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let registry = Registry::new();

    let runs: Arc<Mutex<HashMap<ControlId, usize>>> = Arc::default();
    let counter = Arc::clone(&runs);
    registry.add(Validator::from_async_fn(move |ctx: formx::ValidationContext| {
        let counter = Arc::clone(&counter);
        async move {
            sleep_ms(5).await;
            *counter.lock().unwrap().entry(ctx.control.id()).or_default() += 1;
            Ok(Validity::Valid)
        }
    }));

    let form = Form::new(&doc, el, &registry).unwrap();
    assert!(form.check().await.unwrap());

    let runs = runs.lock().unwrap();
    assert_eq!(runs.len(), 3);
    assert!(runs.values().all(|n| *n == 1));
}

#[tokio::test]
async fn test_form_check_propagates_config_errors() {
    let doc = Document::new();
    let el = mount(
        &doc,
        Element::form().children([field("age").attr("min", "eighteen"), field("name")]),
    );
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    assert!(matches!(
        form.check().await,
        Err(ConfigError::InvalidValue { what: "minimum", .. })
    ));
}

#[tokio::test]
async fn test_errors_for_are_scoped_to_the_form() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let outside = mount(&doc, Element::ul().attr("fx-errors-for", "user"));
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    form.check().await.unwrap();
    let inside = doc.query_attribute(el, "fx-errors-for", Some("user"))[0];
    assert_eq!(rendered(&doc, inside), vec!["User is required"]);
    assert!(rendered(&doc, outside).is_empty());
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_invalid_form_blocks_submission() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let _form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    let button = doc.elements_by_tag(el, "button")[0];

    doc.click(button);
    settle().await;
    assert_eq!(doc.submissions(el), 0);
    assert_eq!(doc.attribute(find(&doc, el, "user"), "fx-valid").as_deref(), Some("false"));
}

#[tokio::test]
async fn test_valid_form_submits_exactly_once() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    doc.input(find(&doc, el, "user"), "jane");
    doc.click(doc.query_attribute(el, "name", Some("plan"))[0]);

    assert!(!form.request_submit());
    settle().await;
    assert_eq!(doc.submissions(el), 1);

    // A direct submit skips validation.
    doc.input(find(&doc, el, "user"), "");
    assert!(form.submit());
    assert_eq!(doc.submissions(el), 2);
}

#[tokio::test]
async fn test_validated_submit() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    assert!(!form.validated_submit().await);
    assert_eq!(doc.submissions(el), 0);

    doc.set_value(find(&doc, el, "user"), "jane").unwrap();
    doc.click(doc.query_attribute(el, "name", Some("plan"))[1]);
    assert!(form.validated_submit().await);
    assert_eq!(doc.submissions(el), 1);
}

#[tokio::test]
async fn test_inert_form_submits_unchecked() {
    let doc = Document::new();
    let el = mount(&doc, Element::form().child(field("user").flag("required")));
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();

    assert!(form.is_inert());
    assert!(form.request_submit());
    assert_eq!(doc.submissions(el), 1);
}

// ============================================================================
// Membership
// ============================================================================

#[tokio::test]
async fn test_controls_follow_the_subtree() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    assert_eq!(form.controls().len(), 3);

    let wrapper = doc
        .insert(el, Element::div().child(field("extra").flag("required")))
        .unwrap();
    settle().await;
    assert_eq!(form.controls().len(), 4);

    let radio = doc
        .insert(el, Element::input("radio").name("plan").value("team"))
        .unwrap();
    settle().await;
    assert_eq!(form.controls().len(), 4);
    assert_eq!(form.control(radio).unwrap().members().len(), 3);

    doc.detach(wrapper).unwrap();
    settle().await;
    assert_eq!(form.controls().len(), 3);

    // Renaming a radio moves it to its own group.
    doc.set_attribute(radio, "name", "tier").unwrap();
    settle().await;
    assert_eq!(form.controls().len(), 4);
    assert_eq!(form.control(radio).unwrap().members(), vec![radio]);
}

#[tokio::test]
async fn test_removed_primary_promotes_next_member() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    let radios = doc.query_attribute(el, "name", Some("plan"));
    let group = form.control(radios[0]).unwrap();

    doc.detach(radios[0]).unwrap();
    settle().await;
    assert_eq!(group.element(), radios[1]);
    assert_eq!(group.members(), vec![radios[1]]);
    assert!(!doc.has_attribute(radios[0], "fx-valid"));
}

#[tokio::test]
async fn test_destroy_detaches_everything() {
    let doc = Document::new();
    let el = mount(&doc, signup());
    let form = Form::new(&doc, el, &Registry::with_defaults()).unwrap();
    let controls = form.controls();

    form.destroy();
    assert!(form.is_destroyed());
    assert!(controls.iter().all(|c| c.is_destroyed()));
    assert_eq!(doc.observer_count(), 0);

    // Submissions are no longer intercepted.
    assert!(doc.request_submit(el));
}
