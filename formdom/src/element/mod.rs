mod node;

pub use node::{Element, CONTROL_TAGS};
