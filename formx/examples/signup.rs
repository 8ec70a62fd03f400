//! Signup form walkthrough: mount a page, type into it and submit.

use formdom::{Document, Element, NodeId};
use formx::{Mount, Priority, Registry, Validator, Validity};
use log::{info, LevelFilter};
use simplelog::{Config, SimpleLogger};

fn page() -> Element {
    Element::form().flag("fx-form").flag("fx-validate").children([
        watched("text", "user", "Username")
            .flag("required")
            .attr("minlength", "3")
            .flag("no-admin"),
        Element::ul().attr("fx-errors-for", "user"),
        watched("email", "email", "Email")
            .flag("required")
            .attr("preset", "email"),
        Element::ul().attr("fx-errors-for", "email"),
        watched("number", "age", "Age").attr("min", "13"),
        watched("checkbox", "terms", "Terms").flag("required"),
        Element::button("submit"),
    ])
}

/// A validated input that re-checks on every keystroke.
fn watched(kind: &str, name: &str, label: &str) -> Element {
    Element::input(kind)
        .name(name)
        .attr("fx-name", label)
        .flag("fx-validate")
        .attr("fx-on", "input")
}

fn field(doc: &Document, form: NodeId, name: &str) -> NodeId {
    doc.query_attribute(form, "name", Some(name))[0]
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::init(LevelFilter::Debug, Config::default())?;

    let registry = Registry::with_defaults();
    registry.add(
        Validator::builder("no-admin")
            .priority(Priority::High)
            .attribute("no-admin")
            .check(|ctx| {
                Ok(Validity::check(!ctx.value.eq_ignore_ascii_case("admin"), || {
                    format!("{} is reserved", ctx.label)
                }))
            }),
    );

    let doc = Document::new();
    let form = doc.insert(doc.root(), page())?;
    let mount = Mount::new(&doc, &registry)?;

    doc.request_submit(form);
    settle().await;
    info!("submissions after empty submit: {}", doc.submissions(form));
    if let Some(instance) = mount.form(form) {
        for message in instance.report().messages() {
            info!("  {message}");
        }
    }

    doc.input(field(&doc, form, "user"), "admin");
    settle().await;
    info!(
        "user errors: {:?}",
        mount
            .control(field(&doc, form, "user"))
            .map(|c| c.errors())
            .unwrap_or_default()
    );

    doc.input(field(&doc, form, "user"), "jane");
    doc.input(field(&doc, form, "email"), "jane@example.com");
    doc.input(field(&doc, form, "age"), "30");
    doc.click(field(&doc, form, "terms"));

    doc.request_submit(form);
    settle().await;
    info!("submissions after valid submit: {}", doc.submissions(form));

    mount.destroy();
    Ok(())
}
