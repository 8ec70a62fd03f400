use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;

use super::{Priority, ValidationContext, Validator, ValidatorFn, ValidatorName, Validity};
use crate::error::ConfigError;

/// Builder for [`Validator`].
///
/// Finished by one of [`check`](Self::check), [`check_async`](Self::check_async)
/// or [`invalidate`](Self::invalidate).
#[derive(Debug)]
pub struct ValidatorBuilder {
    name: ValidatorName,
    priority: Priority,
    attributes: Option<Vec<String>>,
}

impl ValidatorBuilder {
    pub(crate) fn new(name: ValidatorName) -> Self {
        Self {
            name,
            priority: Priority::default(),
            attributes: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a trigger attribute. Earlier attributes take precedence.
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(Vec::new)
            .push(attribute.into());
        self
    }

    /// Add several trigger attributes, in precedence order.
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .get_or_insert_with(Vec::new)
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Finish with a synchronous validation function.
    pub fn check<F>(self, f: F) -> Validator
    where
        F: Fn(&ValidationContext) -> Result<Validity, ConfigError> + Send + Sync + 'static,
    {
        self.build(Arc::new(move |ctx: ValidationContext| {
            let result = f(&ctx);
            futures::future::ready(result).boxed()
        }))
    }

    /// Finish with an asynchronous validation function.
    pub fn check_async<F, Fut>(self, f: F) -> Validator
    where
        F: Fn(ValidationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Validity, ConfigError>> + Send + 'static,
    {
        self.build(Arc::new(move |ctx: ValidationContext| f(ctx).boxed()))
    }

    /// Finish with a callback that reports failures through an [`Invalidator`]
    /// instead of returning them. Not calling `invalidate` means valid.
    pub fn invalidate<F>(self, f: F) -> Validator
    where
        F: Fn(&Invalidator, &ValidationContext) -> Result<(), ConfigError> + Send + Sync + 'static,
    {
        self.check(move |ctx| {
            let invalidator = Invalidator::default();
            f(&invalidator, ctx)?;
            Ok(invalidator.into_validity())
        })
    }

    fn build(self, func: ValidatorFn) -> Validator {
        Validator::from_parts(self.name, self.priority, self.attributes, func)
    }
}

/// Failure sink handed to [`ValidatorBuilder::invalidate`] callbacks.
#[derive(Debug, Default)]
pub struct Invalidator {
    // Outer `Some` once invalidated; inner is the (last) reason.
    state: Mutex<Option<Option<String>>>,
}

impl Invalidator {
    /// Mark the value invalid with a reason.
    pub fn invalidate(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            *state = Some(Some(reason.into()));
        }
    }

    /// Mark the value invalid without a reason.
    pub fn invalidate_silently(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.is_none() {
                *state = Some(None);
            }
        }
    }

    fn into_validity(self) -> Validity {
        match self.state.into_inner().unwrap_or_else(|p| p.into_inner()) {
            Some(reason) => Validity::Invalid(reason),
            None => Validity::Valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_triggers_in_order() {
        let v = Validator::builder("range")
            .priority(Priority::Medium)
            .attribute("fx-range")
            .attributes(["range", "data-range"])
            .check(|_| Ok(Validity::Valid));
        assert_eq!(v.priority(), Priority::Medium);
        assert_eq!(
            v.attributes().map(|a| a.to_vec()),
            Some(vec![
                "fx-range".to_string(),
                "range".to_string(),
                "data-range".to_string()
            ])
        );
    }

    #[test]
    fn invalidator_keeps_last_reason() {
        let inv = Invalidator::default();
        inv.invalidate("first");
        inv.invalidate("second");
        assert_eq!(inv.into_validity(), Validity::invalid("second"));

        let inv = Invalidator::default();
        inv.invalidate_silently();
        assert_eq!(inv.into_validity(), Validity::Invalid(None));

        assert_eq!(Invalidator::default().into_validity(), Validity::Valid);
    }
}
