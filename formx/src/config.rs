//! Markup configuration.

use serde::{Deserialize, Serialize};

/// Names of the markup attributes formx reads and writes.
///
/// One `Config` is shared by every control and form created from the same
/// [`Registry`](crate::Registry).
///
/// # Example
///
/// ```
/// use formx::Config;
///
/// let config = Config::with_prefix("data-fx-")
///     .default_label("This field")
///     .aria(false);
/// assert_eq!(config.validate, "data-fx-validate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enables validation on a control or form when truthy.
    pub validate: String,

    /// Human-readable field name used in generated messages.
    pub display_name: String,

    /// Events that re-trigger validation once started.
    pub on: String,

    /// Events that start validation (defers `on`).
    pub start_on: String,

    /// Marks an error container for the control of the given `name`.
    pub errors_for: String,

    /// Marks a form for automatic instantiation by [`Mount`](crate::Mount).
    pub form_marker: String,

    /// Reflected validity (`"true"` / `"false"`).
    pub valid_state: String,

    /// Reflected checking flag.
    pub checking_state: String,

    /// Reflected started flag.
    pub started_state: String,

    /// Suffixes appended to a trigger attribute to override its message,
    /// looked up in order.
    pub fail_suffixes: Vec<String>,

    /// Separators for multi-value attributes such as `fx-on` or `preset`.
    pub separators: Vec<char>,

    /// Display name used when `display_name` is absent.
    pub default_label: String,

    /// Also reflect validity through `aria-invalid`.
    pub aria: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_prefix("fx-")
    }
}

impl Config {
    /// Create a config whose own attributes all share `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            validate: format!("{prefix}validate"),
            display_name: format!("{prefix}name"),
            on: format!("{prefix}on"),
            start_on: format!("{prefix}start-on"),
            errors_for: format!("{prefix}errors-for"),
            form_marker: format!("{prefix}form"),
            valid_state: format!("{prefix}valid"),
            checking_state: format!("{prefix}checking"),
            started_state: format!("{prefix}started"),
            fail_suffixes: vec!["-fail".to_string(), ":error".to_string()],
            separators: vec![',', ':'],
            default_label: "Field".to_string(),
            aria: true,
        }
    }

    /// Set the fallback display name.
    pub fn default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    /// Enable or disable `aria-invalid` reflection.
    pub fn aria(mut self, enabled: bool) -> Self {
        self.aria = enabled;
        self
    }

    /// Replace the message-override suffixes.
    pub fn fail_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Message-override attributes for a trigger attribute, in lookup order.
    pub fn fail_attributes<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = String> + 'a {
        self.fail_suffixes
            .iter()
            .map(move |suffix| format!("{attribute}{suffix}"))
    }

    /// Split a multi-value attribute into trimmed, non-empty parts.
    pub fn split_multi(&self, value: Option<&str>) -> Vec<String> {
        let Some(value) = value else {
            return Vec::new();
        };

        value
            .split(|c| self.separators.contains(&c))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Whether an attribute value counts as "on": present and empty, `"true"` or `"1"`.
pub fn truthy(value: Option<&str>) -> bool {
    matches!(value, Some("" | "true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        assert!(truthy(Some("")));
        assert!(truthy(Some("true")));
        assert!(truthy(Some("1")));
        assert!(!truthy(Some("false")));
        assert!(!truthy(Some("yes")));
        assert!(!truthy(None));
    }

    #[test]
    fn split_multi_accepts_colons_and_commas() {
        let config = Config::default();
        assert_eq!(
            config.split_multi(Some("blur: input ,change")),
            vec!["blur", "input", "change"]
        );
        assert!(config.split_multi(Some(" , ")).is_empty());
        assert!(config.split_multi(None).is_empty());
    }

    #[test]
    fn fail_attributes_follow_suffix_order() {
        let config = Config::default();
        let attrs: Vec<_> = config.fail_attributes("max-length").collect();
        assert_eq!(attrs, vec!["max-length-fail", "max-length:error"]);
    }

    #[test]
    fn prefix_is_applied_to_every_own_attribute() {
        let config = Config::with_prefix("data-");
        assert_eq!(config.display_name, "data-name");
        assert_eq!(config.errors_for, "data-errors-for");
        assert_eq!(config.started_state, "data-started");
    }
}
