use std::sync::atomic::Ordering;

use futures::future::join_all;
use log::{debug, trace};

use super::Control;
use crate::error::ConfigError;
use crate::validator::{Outcome, Priority};

impl Control {
    /// Validate the control.
    ///
    /// Runs the merged validators tier by tier (`High`, `Medium`, `Low`),
    /// validators of one tier concurrently. A tier with a failure ends the
    /// check. Starting another check revokes this one: it then returns the
    /// validity as it stands without touching state.
    ///
    /// Disabled controls and controls without a truthy `fx-validate` are
    /// valid without running anything.
    pub async fn check(&self) -> Result<bool, ConfigError> {
        if self.is_destroyed() {
            return Ok(self.valid());
        }

        if self.is_inactive() {
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            {
                let mut state = self.write();
                state.valid = true;
                state.checking = false;
                state.errors.clear();
            }
            self.clear_error_display();
            self.clear_state();
            trace!("[control] {} inactive", self.id());
            return Ok(true);
        }

        if self.started() {
            // Restore after an inactive spell cleared it.
            self.reflect(&self.config().started_state, Some("true"));
        } else {
            self.start();
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.write();
            state.checking = true;
            state.errors.clear();
        }
        self.reflect_checking(true);
        self.clear_error_display();

        let attributes = self.shared.doc.attributes(self.element());
        let validators = self.validators();
        debug!(
            "[control] {} check #{generation} with {} validators",
            self.id(),
            validators.len()
        );

        let mut reasons: Vec<Option<String>> = Vec::new();
        for tier in Priority::TIERS {
            let group: Vec<_> = validators.iter().filter(|v| v.priority() == tier).collect();
            if group.is_empty() {
                continue;
            }

            let outcomes = join_all(group.iter().map(|v| v.exec(self, &attributes))).await;
            if !self.is_current(generation) {
                debug!("[control] {} check #{generation} revoked", self.id());
                return Ok(self.valid());
            }

            for outcome in outcomes {
                match outcome {
                    Ok(Outcome::Fail(reason)) => reasons.push(reason),
                    Ok(Outcome::Pass | Outcome::Revoked) => {}
                    Err(e) => {
                        self.finish_checking();
                        return Err(e);
                    }
                }
            }

            if !reasons.is_empty() {
                trace!("[control] {} failed at {tier:?}", self.id());
                break;
            }
        }

        if reasons.is_empty() {
            self.set_valid();
        } else {
            for reason in &reasons {
                self.set_invalid(reason.as_deref());
            }
        }
        self.finish_checking();

        Ok(self.valid())
    }

    /// Mark the control valid, dropping all errors.
    pub fn set_valid(&self) {
        {
            let mut state = self.write();
            state.valid = true;
            state.errors.clear();
        }
        self.reflect_valid(true);
        self.clear_error_display();
    }

    /// Mark the control invalid. A reason is recorded (once) and rendered
    /// into the error containers; `None` records nothing.
    pub fn set_invalid(&self, reason: Option<&str>) {
        let added = {
            let mut state = self.write();
            state.valid = false;
            match reason.filter(|r| !r.is_empty()) {
                Some(reason) if !state.errors.iter().any(|e| e == reason) => {
                    state.errors.push(reason.to_string());
                    Some(reason)
                }
                _ => None,
            }
        };

        self.reflect_valid(false);
        if let Some(reason) = added {
            self.render_error(reason);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.is_destroyed() && self.shared.generation.load(Ordering::SeqCst) == generation
    }

    fn finish_checking(&self) {
        self.write().checking = false;
        if !self.is_destroyed() {
            self.reflect_checking(false);
        }
    }

    // -------------------------------------------------------------------------
    // Error display
    // -------------------------------------------------------------------------

    /// Elements marked `fx-errors-for="<name>"` in the control's form, or in
    /// the whole document for loose controls.
    pub fn error_containers(&self) -> Vec<formdom::NodeId> {
        let Some(name) = self.name().filter(|n| !n.is_empty()) else {
            return Vec::new();
        };
        let doc = &self.shared.doc;
        let el = self.element();
        let scope = doc.form_of(el).unwrap_or_else(|| doc.root());
        doc.query_attribute(scope, &self.config().errors_for, Some(&name))
    }

    fn render_error(&self, reason: &str) {
        let doc = &self.shared.doc;
        for container in self.error_containers() {
            let entry = self.shared.registry.render_error(reason);
            if let Err(e) = doc.insert(container, entry) {
                debug!("[control] {} cannot render into {container}: {e}", self.id());
            }
        }
    }

    fn clear_error_display(&self) {
        for container in self.error_containers() {
            let _ = self.shared.doc.clear_children(container);
        }
    }
}
