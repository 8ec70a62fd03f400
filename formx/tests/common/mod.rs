#![allow(dead_code)]

use std::time::Duration;

use formdom::{Document, Element, NodeId};
use simplelog::{Config, LevelFilter, TestLogger};

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Let listener drivers and spawned checks run to completion.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Wait past slow validators.
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Insert `el` under the document root.
pub fn mount(doc: &Document, el: Element) -> NodeId {
    doc.insert(doc.root(), el).unwrap()
}

/// An active text input.
pub fn field(name: &str) -> Element {
    Element::input("text").name(name).flag("fx-validate")
}

/// Text of each entry rendered into `container`.
pub fn rendered(doc: &Document, container: NodeId) -> Vec<String> {
    doc.children(container)
        .into_iter()
        .map(|child| doc.text(child))
        .collect()
}
