//! Built-in validators.

use regex::Regex;

use super::{Priority, ValidationContext, Validator, Validity};
use crate::config::truthy;
use crate::error::ConfigError;
use crate::preset::format_message;

/// Every built-in validator, in registration order.
pub fn all() -> Vec<Validator> {
    vec![
        required(),
        min_length(),
        max_length(),
        min_value(),
        max_value(),
        pattern(),
        preset(),
    ]
}

/// Value must be present; for checkables and groups, something must be checked.
pub fn required() -> Validator {
    Validator::builder("required")
        .priority(Priority::High)
        .attributes(["fx-required", "required"])
        .check(|ctx| {
            if !truthy(ctx.attribute_value.as_deref()) {
                return Ok(Validity::Valid);
            }

            let present = if ctx.control.is_checkable() {
                ctx.control.any_checked()
            } else {
                !ctx.value.is_empty()
            };
            Ok(Validity::check(present, || format!("{} is required", ctx.label)))
        })
}

pub fn min_length() -> Validator {
    Validator::builder("min-length")
        .priority(Priority::Medium)
        .attributes(["fx-min-length", "min-length", "minlength"])
        .check(|ctx| {
            let n = parse_length(ctx, "minimum length")?;
            Ok(Validity::check(ctx.value.chars().count() >= n, || {
                format!("{} must have at least {n} characters", ctx.label)
            }))
        })
}

pub fn max_length() -> Validator {
    Validator::builder("max-length")
        .priority(Priority::Medium)
        .attributes(["fx-max-length", "max-length", "maxlength"])
        .check(|ctx| {
            let n = parse_length(ctx, "maximum length")?;
            Ok(Validity::check(ctx.value.chars().count() <= n, || {
                format!("{} must have no more than {n} characters", ctx.label)
            }))
        })
}

pub fn min_value() -> Validator {
    Validator::builder("min-value")
        .priority(Priority::Medium)
        .attributes(["fx-min", "min"])
        .check(|ctx| {
            let min = parse_bound(ctx, "minimum")?;
            Ok(compare(ctx, |value| value >= min, || {
                format!(
                    "{} must be greater than or equal to {}",
                    ctx.label,
                    ctx.attribute_value().trim()
                )
            }))
        })
}

pub fn max_value() -> Validator {
    Validator::builder("max-value")
        .priority(Priority::Medium)
        .attributes(["fx-max", "max"])
        .check(|ctx| {
            let max = parse_bound(ctx, "maximum")?;
            Ok(compare(ctx, |value| value <= max, || {
                format!(
                    "{} must be less than or equal to {}",
                    ctx.label,
                    ctx.attribute_value().trim()
                )
            }))
        })
}

/// Value must match the attribute's regular expression (anywhere).
pub fn pattern() -> Validator {
    Validator::builder("pattern")
        .priority(Priority::Low)
        .attributes(["fx-pattern", "pattern"])
        .check(|ctx| {
            let source = ctx.attribute_value();
            let re = Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
                label: ctx.label.clone(),
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
            Ok(Validity::check(re.is_match(&ctx.value), || format_message(&ctx.label)))
        })
}

/// Value must match every listed preset.
pub fn preset() -> Validator {
    Validator::builder("preset")
        .priority(Priority::Low)
        .attributes(["fx-preset", "preset"])
        .check(|ctx| {
            let names = ctx.control.config().split_multi(ctx.attribute_value.as_deref());
            let registry = ctx.control.registry();

            let presets = names
                .iter()
                .map(|name| {
                    registry
                        .preset(name)
                        .ok_or_else(|| ConfigError::UnknownPreset(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            if presets.iter().all(|p| p.is_match(&ctx.value)) {
                return Ok(Validity::Valid);
            }

            let reason = match presets.as_slice() {
                [only] => only.message(&ctx.label),
                _ => format_message(&ctx.label),
            };
            Ok(Validity::invalid(reason))
        })
}

fn parse_length(ctx: &ValidationContext, what: &'static str) -> Result<usize, ConfigError> {
    ctx.attribute_value()
        .trim()
        .parse()
        .map_err(|_| ctx.invalid_value(what))
}

fn parse_bound(ctx: &ValidationContext, what: &'static str) -> Result<f64, ConfigError> {
    ctx.attribute_value()
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ctx.invalid_value(what))
}

/// Empty values pass; non-numeric values fail.
fn compare(ctx: &ValidationContext, ok: impl Fn(f64) -> bool, reason: impl FnOnce() -> String) -> Validity {
    let value = ctx.value.trim();
    if value.is_empty() {
        return Validity::Valid;
    }

    let numeric = value.parse::<f64>().ok().filter(|n| n.is_finite());
    Validity::check(numeric.is_some_and(ok), reason)
}
