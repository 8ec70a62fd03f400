//! Named value formats for the `preset` validator.

use std::sync::Arc;

use regex::Regex;

/// Builds a failure message from a control's display name.
pub type MessageFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

const EMAIL: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE: &str = r"^[\s+()\d]*$";

/// A named regular expression with its failure message.
#[derive(Clone)]
pub struct Preset {
    name: String,
    pattern: Regex,
    message: MessageFn,
}

impl std::fmt::Debug for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preset")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

impl Preset {
    /// Compile a preset with the generic "not in a valid format" message.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            message: Arc::new(format_message),
        })
    }

    /// Replace the failure message.
    pub fn with_message<F>(mut self, message: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.message = Arc::new(message);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    /// Failure message for a control labelled `label`.
    pub fn message(&self, label: &str) -> String {
        (self.message)(label)
    }

    /// `email` and `phone`.
    pub fn defaults() -> Vec<Preset> {
        [("email", EMAIL), ("phone", PHONE)]
            .into_iter()
            .filter_map(|(name, pattern)| match Preset::new(name, pattern) {
                Ok(preset) => Some(preset),
                Err(e) => {
                    log::error!("[preset] built-in `{name}` does not compile: {e}");
                    None
                }
            })
            .collect()
    }
}

/// The message shared by format checks.
pub fn format_message(label: &str) -> String {
    format!("{label} is not in a valid format")
}
