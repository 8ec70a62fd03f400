//! Forms: aggregate validation and submit gating.

mod submit;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use formdom::{ChangeNotifier, Document, ListenerId, Mutation, NodeId, ObserveOptions, ObserverId};
use futures::future::join_all;
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::truthy;
use crate::control::set::{affects_controls, ControlSet};
use crate::control::Control;
use crate::error::{ConfigError, Error};
use crate::registry::Registry;
use crate::result::{FieldError, ValidationResult};

use submit::Signal;

static NEXT_FORM_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique form identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(usize);

impl FormId {
    fn next() -> Self {
        Self(NEXT_FORM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Default)]
struct FormState {
    valid: bool,
    destroyed: bool,
    observer: Option<ObserverId>,
    submit_listener: Option<ListenerId>,
}

pub(crate) struct FormShared {
    id: FormId,
    doc: Document,
    registry: Registry,
    el: NodeId,
    controls: Mutex<ControlSet>,
    state: RwLock<FormState>,
    // Set while a validated submission is re-dispatched.
    resubmitting: AtomicBool,
    signals: mpsc::UnboundedSender<Signal>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Validation for one `form` element and the controls inside it.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), formx::Error> {
/// use formdom::{Document, Element};
/// use formx::{Form, Registry};
///
/// let doc = Document::new();
/// let el = doc.insert(
///     doc.root(),
///     Element::form()
///         .flag("fx-validate")
///         .child(Element::input("text").name("user").flag("fx-validate").flag("required")),
/// )?;
///
/// let form = Form::new(&doc, el, &Registry::with_defaults())?;
/// assert!(!form.check().await?);
/// assert_eq!(form.report().messages(), vec!["Field is required"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Form {
    shared: Arc<FormShared>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.shared.id)
            .field("el", &self.shared.el)
            .field("valid", &self.valid())
            .finish_non_exhaustive()
    }
}

impl Form {
    /// Attach to a `form` element, creating controls for its control elements.
    pub fn new(doc: &Document, el: NodeId, registry: &Registry) -> Result<Self, Error> {
        if doc.tag(el).as_deref() != Some("form") {
            return Err(Error::NotAForm(el));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let form = Self {
            shared: Arc::new(FormShared {
                id: FormId::next(),
                doc: doc.clone(),
                registry: registry.clone(),
                el,
                controls: Mutex::new(ControlSet::new(doc, registry)),
                state: RwLock::new(FormState {
                    valid: true,
                    ..Default::default()
                }),
                resubmitting: AtomicBool::new(false),
                signals: tx,
                driver: Mutex::new(None),
            }),
        };

        form.sync()?;

        let driver = runtime.spawn(submit::drive(Arc::downgrade(&form.shared), rx));
        if let Ok(mut slot) = form.shared.driver.lock() {
            *slot = Some(driver);
        }

        let observer = form.observe();
        let listener = form.listen_submit();
        if let Ok(mut state) = form.shared.state.write() {
            state.observer = Some(observer);
            state.submit_listener = Some(listener);
        }

        debug!("[form] {} attached to {el}", form.id());
        Ok(form)
    }

    fn controls_guard(&self) -> MutexGuard<'_, ControlSet> {
        self.shared
            .controls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ptr_eq(&self, other: &Form) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn id(&self) -> FormId {
        self.shared.id
    }

    pub fn element(&self) -> NodeId {
        self.shared.el
    }

    pub fn document(&self) -> &Document {
        &self.shared.doc
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Aggregate validity as of the last completed check.
    pub fn valid(&self) -> bool {
        self.shared.state.read().map(|s| s.valid).unwrap_or(true)
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.read().map(|s| s.destroyed).unwrap_or(false)
    }

    /// A form without a truthy `fx-validate` lets submissions through unchecked.
    pub fn is_inert(&self) -> bool {
        let validate = &self.shared.registry.config().validate;
        !truthy(self.shared.doc.attribute(self.shared.el, validate).as_deref())
    }

    /// Controls in document order.
    pub fn controls(&self) -> Vec<Control> {
        self.controls_guard().controls()
    }

    /// The control owning `node`.
    pub fn control(&self, node: NodeId) -> Option<Control> {
        self.controls_guard().find(node)
    }

    /// Re-scan the form's control elements.
    pub fn sync(&self) -> Result<(), Error> {
        let doc = &self.shared.doc;
        let el = self.shared.el;
        let elements: Vec<_> = doc
            .control_elements(el)
            .into_iter()
            .filter(|node| doc.form_of(*node) == Some(el))
            .collect();
        self.controls_guard().sync(&elements)
    }

    /// Check every control concurrently. The form is valid if all are.
    pub async fn check(&self) -> Result<bool, ConfigError> {
        let controls = self.controls();
        debug!("[form] {} checking {} controls", self.id(), controls.len());

        let results = join_all(controls.iter().map(|c| c.check())).await;
        let mut valid = true;
        for result in results {
            valid &= result?;
        }

        if let Ok(mut state) = self.shared.state.write() {
            state.valid = valid;
        }
        Ok(valid)
    }

    /// Last-known errors of every control.
    pub fn report(&self) -> ValidationResult {
        self.controls()
            .iter()
            .filter(|c| !c.valid())
            .flat_map(|c| {
                let field_name = c.name().unwrap_or_default();
                let label = c.label();
                let node = c.element();
                let errors = c.errors();
                let messages: Vec<Option<String>> = if errors.is_empty() {
                    vec![None]
                } else {
                    errors.into_iter().map(Some).collect()
                };
                messages.into_iter().map(move |message| FieldError {
                    field_name: field_name.clone(),
                    label: label.clone(),
                    node,
                    message,
                })
            })
            .collect()
    }

    /// Detach from the document and destroy all controls.
    pub fn destroy(&self) {
        let (observer, listener) = {
            let Ok(mut state) = self.shared.state.write() else {
                return;
            };
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            (state.observer.take(), state.submit_listener.take())
        };

        if let Some(observer) = observer {
            self.shared.doc.disconnect(observer);
        }
        if let Some(listener) = listener {
            self.shared.doc.remove_listener(listener);
        }
        self.controls_guard().destroy_all();

        if let Ok(mut driver) = self.shared.driver.lock() {
            if let Some(driver) = driver.take() {
                driver.abort();
            }
        }
        debug!("[form] {} destroyed", self.id());
    }

    /// Watch the subtree for controls coming, going or changing group.
    fn observe(&self) -> ObserverId {
        let form = Arc::downgrade(&self.shared);
        let signals = self.shared.signals.clone();
        let options = ObserveOptions::child_list()
            .with_attributes()
            .subtree()
            .filter(["type", "name"]);

        self.shared.doc.observe(
            self.shared.el,
            options,
            Arc::new(move |mutation: &Mutation| {
                let Some(shared) = Weak::upgrade(&form) else {
                    return;
                };
                if affects_controls(&shared.doc, mutation) {
                    let _ = signals.send(Signal::Sync);
                }
            }),
        )
    }
}
