mod common;

use formdom::{Document, Element};
use formx::{Control, Preset, PresetRegistration, Registry, Validator, ValidatorRegistration, Validity};

use common::{field, mount};

fn uppercase() -> Validator {
    Validator::builder("uppercase")
        .attribute("uppercase")
        .check(|ctx| {
            Ok(Validity::check(ctx.value == ctx.value.to_uppercase(), || {
                format!("{} must be uppercase", ctx.label)
            }))
        })
}

fn postcode() -> Result<Preset, regex::Error> {
    Ok(Preset::new("postcode", r"^\d{4}\s?[A-Z]{2}$")?.with_message(|label| format!("{label} is not a postcode")))
}

formx::inventory::submit! {
    ValidatorRegistration::new(uppercase)
}

formx::inventory::submit! {
    PresetRegistration::new(postcode)
}

#[test]
fn test_registrations_are_collected() {
    let registry = Registry::with_defaults();
    assert!(registry.validator("uppercase").is_some());
    assert!(registry.preset_names().contains(&"postcode".to_string()));

    // Plain registries stay empty.
    assert!(Registry::new().validator("uppercase").is_none());
}

#[tokio::test]
async fn test_registered_validator_and_preset_apply() {
    let doc = Document::new();
    let registry = Registry::with_defaults();

    let node = mount(&doc, field("code").flag("uppercase"));
    doc.set_value(node, "abc").unwrap();
    let control = Control::new(&doc, node, &registry).unwrap();
    assert!(!control.check().await.unwrap());
    assert_eq!(control.errors(), vec!["Field must be uppercase"]);

    let node = mount(
        &doc,
        Element::input("text")
            .flag("fx-validate")
            .attr("fx-name", "Postcode")
            .attr("preset", "postcode"),
    );
    doc.set_value(node, "12345").unwrap();
    let control = Control::new(&doc, node, &registry).unwrap();
    assert!(!control.check().await.unwrap());
    assert_eq!(control.errors(), vec!["Postcode is not a postcode"]);

    doc.set_value(node, "1234 AB").unwrap();
    assert!(control.check().await.unwrap());
}

#[tokio::test]
async fn test_unregistered_validator_stops_applying() {
    let doc = Document::new();
    let registry = Registry::with_defaults();
    let node = mount(&doc, field("code").flag("uppercase"));
    doc.set_value(node, "abc").unwrap();
    let control = Control::new(&doc, node, &registry).unwrap();

    assert!(!control.check().await.unwrap());
    registry.remove("uppercase");
    assert!(control.check().await.unwrap());
    assert!(!control.watched_attributes().iter().any(|a| a == "uppercase"));
}
