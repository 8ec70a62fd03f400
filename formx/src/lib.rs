//! Declarative, attribute-driven form validation.
//!
//! Markup attributes switch validators on and configure them:
//!
//! ```text
//! <form fx-form fx-validate>
//!   <input name="email" fx-validate fx-name="Email" required preset="email">
//!   <ul fx-errors-for="email"></ul>
//! </form>
//! ```
//!
//! A [`Control`] runs the matching [`Validator`]s tier by tier and reflects
//! the outcome back as `fx-valid` / `fx-checking` attributes and rendered
//! error entries. A [`Form`] checks all of its controls before letting a
//! submission through. [`Mount`] wires everything up for a whole document.

pub mod config;
pub mod control;
pub mod error;
pub mod form;
pub mod mount;
pub mod preset;
pub mod registry;
pub mod result;
pub mod validator;

pub use config::{truthy, Config};
pub use control::{Control, ControlId};
pub use error::{ConfigError, Error};
pub use form::{Form, FormId};
pub use mount::Mount;
pub use preset::Preset;
pub use registry::{ErrorTemplate, PresetRegistration, Registry, ValidatorRegistration};
pub use result::{FieldError, ValidationResult};
pub use validator::{
    Activation, Attributes, Invalidator, Outcome, Priority, ValidationContext, Validator, ValidatorBuilder,
    ValidatorName, Validity,
};

// Re-export so registrations don't need their own dependency.
pub use inventory;
