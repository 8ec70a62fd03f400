//! Validators: named, prioritized, optionally attribute-gated checks.
//!
//! A validator is either *standalone* (always runs) or *attributed* (runs
//! only when one of its trigger attributes is present on the control, and
//! receives that attribute's value as configuration).

mod builder;
pub mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use builder::{Invalidator, ValidatorBuilder};

use crate::control::{Control, ControlId};
use crate::error::ConfigError;

/// Attribute snapshot of a control's primary element, taken once per check.
pub type Attributes = HashMap<String, String>;

/// Boxed future returned by validation functions.
pub type ValidatorFuture = BoxFuture<'static, Result<Validity, ConfigError>>;

/// Type-erased validation function.
pub type ValidatorFn = Arc<dyn Fn(ValidationContext) -> ValidatorFuture + Send + Sync>;

/// Execution tier. Tiers run `High` → `Medium` → `Low`; a failing tier
/// skips the ones after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Cheap, low-value checks (patterns, presets).
    #[default]
    Low,
    /// Range and length checks.
    Medium,
    /// Fundamental checks such as `required`.
    High,
}

impl Priority {
    /// Tiers in execution order.
    pub const TIERS: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
}

/// Identity of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidatorName {
    Named(String),
    /// Process-unique name for validators built from a bare function.
    Anonymous(Uuid),
}

impl ValidatorName {
    /// Create a fresh anonymous name.
    pub fn anonymous() -> Self {
        Self::Anonymous(Uuid::new_v4())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Anonymous(_) => None,
        }
    }
}

impl From<&str> for ValidatorName {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ValidatorName {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<&ValidatorName> for ValidatorName {
    fn from(name: &ValidatorName) -> Self {
        name.clone()
    }
}

impl std::fmt::Display for ValidatorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Anonymous(id) => write!(f, "<anonymous {id}>"),
        }
    }
}

/// Result of a validation function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// Failed, optionally with a reason. A failure without a reason flips
    /// the control to invalid without recording a message.
    Invalid(Option<String>),
}

impl Validity {
    /// Failure with a reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(Some(reason.into()))
    }

    /// `Valid` if `ok`, else a failure with `reason`.
    pub fn check(ok: bool, reason: impl FnOnce() -> String) -> Self {
        if ok { Self::Valid } else { Self::Invalid(Some(reason())) }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Outcome of one validator execution against one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(Option<String>),
    /// A newer execution of the same validator on the same control started
    /// before this one finished; its result was discarded.
    Revoked,
}

/// Input handed to a validation function.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Display name of the control.
    pub label: String,
    /// Current value of the control.
    pub value: String,
    /// Trigger attribute that activated the validator (attributed only).
    pub attribute: Option<String>,
    /// Value of that attribute.
    pub attribute_value: Option<String>,
    /// The control being validated.
    pub control: Control,
}

impl ValidationContext {
    /// The trigger attribute's value, or `""` for standalone validators.
    pub fn attribute_value(&self) -> &str {
        self.attribute_value.as_deref().unwrap_or_default()
    }

    /// A configuration error for the current trigger attribute.
    pub fn invalid_value(&self, what: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            label: self.label.clone(),
            what,
            attribute: self.attribute.clone().unwrap_or_default(),
            value: self.attribute_value().to_string(),
        }
    }
}

/// How a validator applies to a given attribute snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation<'a> {
    /// No trigger attributes: always runs.
    Standalone,
    /// The first present trigger attribute and its value.
    Attributed { attribute: &'a str, value: &'a str },
    /// None of the trigger attributes are present: passes trivially.
    Inactive,
}

/// A named, prioritized validation rule.
///
/// # Example
///
/// ```
/// use formx::{Priority, Validator, Validity};
///
/// let even = Validator::builder("even-length")
///     .priority(Priority::Medium)
///     .attribute("even")
///     .check(|ctx| Ok(Validity::check(ctx.value.len() % 2 == 0, || {
///         format!("{} must have an even length", ctx.label)
///     })));
/// assert_eq!(even.attributes(), Some(&["even".to_string()][..]));
/// ```
pub struct Validator {
    name: ValidatorName,
    priority: Priority,
    attributes: Option<Vec<String>>,
    func: ValidatorFn,
    // Token of the current execution per control.
    runs: Mutex<HashMap<ControlId, u64>>,
    next_run: AtomicU64,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Start building a named validator.
    pub fn builder(name: impl Into<ValidatorName>) -> ValidatorBuilder {
        ValidatorBuilder::new(name.into())
    }

    /// Anonymous, standalone, `Low` priority validator from a synchronous function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ValidationContext) -> Result<Validity, ConfigError> + Send + Sync + 'static,
    {
        ValidatorBuilder::new(ValidatorName::anonymous()).check(f)
    }

    /// Anonymous, standalone, `Low` priority validator from an async function.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(ValidationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Validity, ConfigError>> + Send + 'static,
    {
        ValidatorBuilder::new(ValidatorName::anonymous()).check_async(f)
    }

    pub(crate) fn from_parts(
        name: ValidatorName,
        priority: Priority,
        attributes: Option<Vec<String>>,
        func: ValidatorFn,
    ) -> Self {
        Self {
            name,
            priority,
            attributes,
            func,
            runs: Mutex::new(HashMap::new()),
            next_run: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &ValidatorName {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Trigger attributes, or `None` for standalone validators.
    pub fn attributes(&self) -> Option<&[String]> {
        self.attributes.as_deref()
    }

    pub fn is_standalone(&self) -> bool {
        self.attributes.is_none()
    }

    /// Decide whether (and with which configuration) the validator runs.
    pub fn resolve<'a>(&'a self, attributes: &'a Attributes) -> Activation<'a> {
        let Some(triggers) = &self.attributes else {
            return Activation::Standalone;
        };

        triggers
            .iter()
            .find_map(|name| {
                attributes.get(name).map(|value| Activation::Attributed {
                    attribute: name.as_str(),
                    value: value.as_str(),
                })
            })
            .unwrap_or(Activation::Inactive)
    }

    /// Number of executions currently in flight, across all controls.
    pub fn in_flight(&self) -> usize {
        self.runs.lock().map(|runs| runs.len()).unwrap_or(0)
    }

    /// Run the validator against `control`.
    ///
    /// `attributes` is the control's attribute snapshot for the current check.
    /// Configuration errors are returned as `Err`; validation failures as
    /// [`Outcome::Fail`].
    pub async fn exec(&self, control: &Control, attributes: &Attributes) -> Result<Outcome, ConfigError> {
        let (attribute, attribute_value) = match self.resolve(attributes) {
            Activation::Standalone => (None, None),
            Activation::Attributed { attribute, value } => {
                (Some(attribute.to_string()), Some(value.to_string()))
            }
            Activation::Inactive => {
                trace!("[validator] {} inactive on {}", self.name, control.id());
                return Ok(Outcome::Pass);
            }
        };

        let ctx = ValidationContext {
            label: control.label_in(attributes),
            value: control.value(),
            attribute,
            attribute_value,
            control: control.clone(),
        };

        let token = self.begin(control.id());
        let result = (self.func)(ctx).await;

        if !self.finish(control.id(), token) {
            debug!("[validator] {} run {token} on {} revoked", self.name, control.id());
            return Ok(Outcome::Revoked);
        }

        match result? {
            Validity::Valid => Ok(Outcome::Pass),
            Validity::Invalid(reason) => {
                let overridden = self.override_reason(control, attributes);
                Ok(Outcome::Fail(overridden.or(reason)))
            }
        }
    }

    /// Message override from `<trigger><suffix>` attributes, first match wins.
    fn override_reason(&self, control: &Control, attributes: &Attributes) -> Option<String> {
        let config = control.config();
        self.attributes.as_ref()?.iter().find_map(|attribute| {
            config
                .fail_attributes(attribute)
                .find_map(|name| attributes.get(&name).cloned())
        })
    }

    /// Register a new execution for `control`, superseding any previous one.
    fn begin(&self, control: ControlId) -> u64 {
        let token = self.next_run.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut runs) = self.runs.lock() {
            runs.insert(control, token);
        }
        token
    }

    /// Whether `token` is still current for `control`; clears it if so.
    fn finish(&self, control: ControlId, token: u64) -> bool {
        let Ok(mut runs) = self.runs.lock() else {
            return true;
        };
        if runs.get(&control) == Some(&token) {
            runs.remove(&control);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn standalone_always_resolves() {
        let v = Validator::from_fn(|_| Ok(Validity::Valid));
        assert!(v.is_standalone());
        assert_eq!(v.resolve(&snapshot(&[])), Activation::Standalone);
        assert_eq!(v.priority(), Priority::Low);
        assert!(v.name().as_str().is_none());
    }

    #[test]
    fn first_present_trigger_wins() {
        let v = Validator::builder("max")
            .attributes(["fx-max", "max"])
            .check(|_| Ok(Validity::Valid));
        let attrs = snapshot(&[("max", "3"), ("fx-max", "5")]);
        assert_eq!(
            v.resolve(&attrs),
            Activation::Attributed {
                attribute: "fx-max",
                value: "5"
            }
        );
        assert_eq!(v.resolve(&snapshot(&[("min", "1")])), Activation::Inactive);
    }

    #[test]
    fn anonymous_names_are_unique() {
        assert_ne!(ValidatorName::anonymous(), ValidatorName::anonymous());
        assert_eq!(ValidatorName::from("x").to_string(), "x");
    }

    #[test]
    fn tiers_run_high_first() {
        assert_eq!(Priority::TIERS[0], Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
