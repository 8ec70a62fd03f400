//! Automatic instantiation over a whole document.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use formdom::{ChangeNotifier, Document, Mutation, NodeId, ObserveOptions, ObserverId};
use log::{debug, error};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::control::set::{affects_controls, ControlSet};
use crate::control::Control;
use crate::error::Error;
use crate::form::Form;
use crate::registry::Registry;

struct Instances {
    forms: Vec<Form>,
    loose: ControlSet,
    observer: Option<ObserverId>,
    destroyed: bool,
}

struct MountShared {
    doc: Document,
    registry: Registry,
    instances: Mutex<Instances>,
    signals: mpsc::UnboundedSender<()>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps a [`Form`] on every marked form and a [`Control`] on every control
/// outside those forms, following the document as nodes come and go.
///
/// Forms qualify by carrying the form marker (`fx-form` by default).
#[derive(Clone)]
pub struct Mount {
    shared: Arc<MountShared>,
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instances = self.instances();
        f.debug_struct("Mount")
            .field("forms", &instances.forms.len())
            .field("controls", &instances.loose.controls().len())
            .finish()
    }
}

impl Mount {
    /// Scan `doc` and start following it.
    pub fn new(doc: &Document, registry: &Registry) -> Result<Self, Error> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mount = Self {
            shared: Arc::new(MountShared {
                doc: doc.clone(),
                registry: registry.clone(),
                instances: Mutex::new(Instances {
                    forms: Vec::new(),
                    loose: ControlSet::new(doc, registry),
                    observer: None,
                    destroyed: false,
                }),
                signals: tx,
                driver: Mutex::new(None),
            }),
        };

        mount.sync()?;

        let weak: Weak<MountShared> = Arc::downgrade(&mount.shared);
        let driver = runtime.spawn(async move {
            while rx.recv().await.is_some() {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let mount = Mount { shared };
                if let Err(e) = mount.sync() {
                    error!("[mount] {e}");
                }
            }
        });
        if let Ok(mut slot) = mount.shared.driver.lock() {
            *slot = Some(driver);
        }

        let observer = mount.observe();
        mount.instances().observer = Some(observer);

        Ok(mount)
    }

    fn instances(&self) -> MutexGuard<'_, Instances> {
        self.shared
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn observe(&self) -> ObserverId {
        let shared = Arc::downgrade(&self.shared);
        let signals = self.shared.signals.clone();
        let config = self.shared.registry.config();
        let options = ObserveOptions::child_list()
            .with_attributes()
            .subtree()
            .filter(["type".to_string(), "name".to_string(), config.form_marker.clone()]);

        let doc = &self.shared.doc;
        doc.observe(
            doc.root(),
            options,
            Arc::new(move |mutation: &Mutation| {
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if affects_controls(&shared.doc, mutation) {
                    let _ = signals.send(());
                }
            }),
        )
    }

    /// Reconcile forms and loose controls with the document.
    pub fn sync(&self) -> Result<(), Error> {
        let doc = &self.shared.doc;
        let marker = &self.shared.registry.config().form_marker;
        let root = doc.root();

        let marked: Vec<NodeId> = doc
            .elements_by_tag(root, "form")
            .into_iter()
            .filter(|f| doc.has_attribute(*f, marker))
            .collect();
        let loose: Vec<NodeId> = doc
            .control_elements(root)
            .into_iter()
            .filter(|c| doc.form_of(*c).is_none_or(|f| !marked.contains(&f)))
            .collect();

        let mut instances = self.instances();
        if instances.destroyed {
            return Ok(());
        }

        instances.forms.retain(|form| {
            let keep = marked.contains(&form.element());
            if !keep {
                form.destroy();
            }
            keep
        });

        // Release adopted controls before their new form claims them.
        instances.loose.sync(&loose)?;

        for el in &marked {
            if !instances.forms.iter().any(|f| f.element() == *el) {
                debug!("[mount] new form for {el}");
                instances.forms.push(Form::new(doc, *el, &self.shared.registry)?);
            }
        }
        Ok(())
    }

    /// The form instance on `node`.
    pub fn form(&self, node: NodeId) -> Option<Form> {
        self.instances()
            .forms
            .iter()
            .find(|f| f.element() == node)
            .cloned()
    }

    pub fn forms(&self) -> Vec<Form> {
        self.instances().forms.clone()
    }

    /// The control owning `node`, whether loose or inside a mounted form.
    pub fn control(&self, node: NodeId) -> Option<Control> {
        let instances = self.instances();
        instances
            .loose
            .find(node)
            .or_else(|| instances.forms.iter().find_map(|f| f.control(node)))
    }

    /// Controls outside mounted forms.
    pub fn loose_controls(&self) -> Vec<Control> {
        self.instances().loose.controls()
    }

    /// Stop following the document and destroy every instance.
    pub fn destroy(&self) {
        let observer = {
            let mut instances = self.instances();
            if instances.destroyed {
                return;
            }
            instances.destroyed = true;
            for form in instances.forms.drain(..) {
                form.destroy();
            }
            instances.loose.destroy_all();
            instances.observer.take()
        };

        if let Some(observer) = observer {
            self.shared.doc.disconnect(observer);
        }
        if let Ok(mut driver) = self.shared.driver.lock() {
            if let Some(driver) = driver.take() {
                driver.abort();
            }
        }
        debug!("[mount] destroyed");
    }
}
