//! Submit interception.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use formdom::{Event, ListenerId};
use log::{debug, error, trace};
use tokio::sync::mpsc;

use super::{Form, FormShared};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// Controls may have come, gone or changed group.
    Sync,
    /// A submission was intercepted.
    Submit,
}

pub(crate) async fn drive(form: Weak<FormShared>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        let Some(shared) = form.upgrade() else {
            break;
        };
        let form = Form { shared };
        if form.is_destroyed() {
            break;
        }

        trace!("[form] {} received {signal:?}", form.id());
        match signal {
            Signal::Sync => {
                if let Err(e) = form.sync() {
                    error!("[form] {}: {e}", form.id());
                }
            }
            Signal::Submit => {
                tokio::spawn(async move { form.validated_submit().await });
            }
        }
    }
}

impl Form {
    /// Intercept native submissions of an active form.
    pub(super) fn listen_submit(&self) -> ListenerId {
        let form = Arc::downgrade(&self.shared);
        self.shared.doc.add_listener(self.shared.el, "submit", move |event: &Event| {
            let Some(shared) = form.upgrade() else {
                return;
            };
            let form = Form { shared };
            if form.shared.resubmitting.load(Ordering::SeqCst) || form.is_inert() {
                return;
            }

            event.prevent_default();
            let _ = form.shared.signals.send(Signal::Submit);
        })
    }

    /// Check the form and submit it if valid.
    ///
    /// Returns whether the form was submitted.
    pub async fn validated_submit(&self) -> bool {
        match self.check().await {
            Ok(true) => self.submit(),
            Ok(false) => {
                debug!("[form] {} submission blocked", self.id());
                false
            }
            Err(e) => {
                error!("[form] {}: {e}", self.id());
                false
            }
        }
    }

    /// Submit without validating.
    ///
    /// Dispatches `submit` once with interception suspended.
    pub fn submit(&self) -> bool {
        self.shared.resubmitting.store(true, Ordering::SeqCst);
        let submitted = self.shared.doc.request_submit(self.shared.el);
        self.shared.resubmitting.store(false, Ordering::SeqCst);
        submitted
    }

    /// Ask for a submission as a user would: an active form intercepts it
    /// and submits once its controls are valid.
    ///
    /// Returns whether the submission went through immediately.
    pub fn request_submit(&self) -> bool {
        self.shared.doc.request_submit(self.shared.el)
    }
}
