//! Global validators, presets and the error template.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use formdom::Element;
use log::{debug, warn};

use crate::config::Config;
use crate::preset::Preset;
use crate::validator::{builtin, Validator, ValidatorName};

/// Renders one failure reason into an error container entry.
pub type ErrorTemplate = Arc<dyn Fn(&str) -> Element + Send + Sync>;

/// Validator registration entry for inventory.
///
/// ```ignore
/// inventory::submit! {
///     formx::ValidatorRegistration::new(|| {
///         formx::Validator::builder("uppercase")
///             .attribute("uppercase")
///             .check(|ctx| Ok(formx::Validity::check(
///                 ctx.value == ctx.value.to_uppercase(),
///                 || format!("{} must be uppercase", ctx.label),
///             )))
///     })
/// }
/// ```
pub struct ValidatorRegistration {
    /// Factory function to create the validator.
    pub factory: fn() -> Validator,
}

impl ValidatorRegistration {
    pub const fn new(factory: fn() -> Validator) -> Self {
        Self { factory }
    }
}

inventory::collect!(ValidatorRegistration);

/// Preset registration entry for inventory.
pub struct PresetRegistration {
    /// Factory function to create the preset.
    pub factory: fn() -> Result<Preset, regex::Error>,
}

impl PresetRegistration {
    pub const fn new(factory: fn() -> Result<Preset, regex::Error>) -> Self {
        Self { factory }
    }
}

inventory::collect!(PresetRegistration);

/// Get all registered validators.
pub fn registered_validators() -> impl Iterator<Item = &'static ValidatorRegistration> {
    inventory::iter::<ValidatorRegistration>()
}

/// Get all registered presets.
pub fn registered_presets() -> impl Iterator<Item = &'static PresetRegistration> {
    inventory::iter::<PresetRegistration>()
}

struct Inner {
    // Registration order is execution order within a tier.
    validators: Vec<Arc<Validator>>,
    presets: HashMap<String, Preset>,
    template: ErrorTemplate,
}

/// Shared registry of global validators and presets.
///
/// Cloning is cheap; all clones share the same sets.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
    config: Arc<Config>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Registry")
            .field("validators", &inner.validators.len())
            .field("presets", &inner.presets.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Registry {
    /// Empty registry with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Empty registry with a custom [`Config`].
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                validators: Vec::new(),
                presets: HashMap::new(),
                template: Arc::new(|reason: &str| Element::li(reason)),
            })),
            config: Arc::new(config),
        }
    }

    /// Registry with the built-in validators, the default presets and every
    /// inventory registration.
    pub fn with_defaults() -> Self {
        Self::new().install_defaults()
    }

    /// Add built-ins and inventory registrations to this registry.
    pub fn install_defaults(self) -> Self {
        for validator in builtin::all() {
            self.add(validator);
        }
        for preset in Preset::defaults() {
            self.add_preset(preset);
        }

        for registration in registered_validators() {
            self.add((registration.factory)());
        }
        for registration in registered_presets() {
            match (registration.factory)() {
                Ok(preset) => {
                    self.add_preset(preset);
                }
                Err(e) => warn!("[registry] skipping preset registration: {e}"),
            }
        }
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Validators
    // -------------------------------------------------------------------------

    /// Register a global validator, replacing (in place) one of the same name.
    pub fn add(&self, validator: Validator) -> Option<Arc<Validator>> {
        let validator = Arc::new(validator);
        let mut inner = self.write();
        debug!("[registry] add validator {}", validator.name());

        match inner
            .validators
            .iter_mut()
            .find(|v| v.name() == validator.name())
        {
            Some(slot) => Some(std::mem::replace(slot, validator)),
            None => {
                inner.validators.push(validator);
                None
            }
        }
    }

    /// Unregister a global validator.
    pub fn remove(&self, name: impl Into<ValidatorName>) -> Option<Arc<Validator>> {
        let name = name.into();
        let mut inner = self.write();
        let index = inner.validators.iter().position(|v| *v.name() == name)?;
        debug!("[registry] remove validator {name}");
        Some(inner.validators.remove(index))
    }

    pub fn validator(&self, name: impl Into<ValidatorName>) -> Option<Arc<Validator>> {
        let name = name.into();
        self.read()
            .validators
            .iter()
            .find(|v| *v.name() == name)
            .cloned()
    }

    /// Snapshot of the global validators in registration order.
    pub fn validators(&self) -> Vec<Arc<Validator>> {
        self.read().validators.clone()
    }

    // -------------------------------------------------------------------------
    // Presets
    // -------------------------------------------------------------------------

    /// Register a preset, returning the one it replaced.
    pub fn add_preset(&self, preset: Preset) -> Option<Preset> {
        debug!("[registry] add preset {}", preset.name());
        self.write()
            .presets
            .insert(preset.name().to_string(), preset)
    }

    pub fn remove_preset(&self, name: &str) -> Option<Preset> {
        self.write().presets.remove(name)
    }

    pub fn preset(&self, name: &str) -> Option<Preset> {
        self.read().presets.get(name).cloned()
    }

    /// Registered preset names, sorted.
    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read().presets.keys().cloned().collect();
        names.sort();
        names
    }

    // -------------------------------------------------------------------------
    // Error template
    // -------------------------------------------------------------------------

    /// Replace the element rendered for each failure reason (default `<li>`).
    pub fn set_error_template<F>(&self, template: F)
    where
        F: Fn(&str) -> Element + Send + Sync + 'static,
    {
        self.write().template = Arc::new(template);
    }

    /// Render `reason` with the current template.
    pub fn render_error(&self, reason: &str) -> Element {
        let template = Arc::clone(&self.read().template);
        template(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Priority, Validity};

    #[test]
    fn defaults_include_builtins_and_presets() {
        let registry = Registry::with_defaults();
        for name in [
            "required",
            "min-length",
            "max-length",
            "min-value",
            "max-value",
            "pattern",
            "preset",
        ] {
            assert!(registry.validator(name).is_some(), "missing {name}");
        }
        assert!(registry.preset("email").is_some());
        assert!(registry.preset("phone").is_some());
    }

    #[test]
    fn add_replaces_in_place() {
        let registry = Registry::new();
        registry.add(Validator::builder("a").check(|_| Ok(Validity::Valid)));
        registry.add(Validator::builder("b").check(|_| Ok(Validity::Valid)));
        let old = registry.add(
            Validator::builder("a")
                .priority(Priority::High)
                .check(|_| Ok(Validity::Valid)),
        );
        assert!(old.is_some());

        let validators = registry.validators();
        assert_eq!(validators.len(), 2);
        assert_eq!(validators[0].name(), &ValidatorName::from("a"));
        assert_eq!(validators[0].priority(), Priority::High);

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.validators().len(), 1);
    }

    #[test]
    fn presets_can_be_replaced_and_removed() {
        let registry = Registry::new();
        assert!(registry.add_preset(Preset::new("zip", r"^\d{5}$").unwrap()).is_none());
        assert!(registry.add_preset(Preset::new("zip", r"^\d+$").unwrap()).is_some());
        assert_eq!(registry.preset_names(), vec!["zip"]);
        assert!(registry.remove_preset("zip").is_some());
        assert!(registry.preset("zip").is_none());
    }

    #[test]
    fn error_template() {
        let registry = Registry::new();
        assert_eq!(registry.render_error("bad").tag, "li");

        registry.set_error_template(|reason| Element::div().text(reason));
        let el = registry.render_error("bad");
        assert_eq!(el.tag, "div");
        assert_eq!(el.text, "bad");
    }
}
