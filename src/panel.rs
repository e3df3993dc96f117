//! Control panel: the composition root a UI drives.
//!
//! `ControlPanel` owns the [`PortSession`], the [`BindingRegistry`] and the
//! [`ApplyCoordinator`] and exposes the entry points a front end calls in
//! response to operator actions:
//!
//! ```text
//!   select / deselect ──► SelectionQueue ──► PortSession ──► BindingRegistry dispatch
//!   apply ──────────────► ApplyCoordinator ──► enabled bindings
//!   import / export ────► codec ──► bindings
//! ```
//!
//! # Selection Queue
//!
//! Selections never run re-entrantly. A session listener that asks for a new
//! selection pushes it onto the [`SelectionQueue`]; the request is processed
//! only after the dispatch in flight has reached every binding.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::{info, warn};

use crate::apply::{ApplyCoordinator, ApplyReport};
use crate::binding::{
    AttributeBinding, ClockFrequencyBinding, CommandBinding, FirmwareBinding, FlagBinding,
    MemoryCapBinding, RegisterBinding, TxModifiersBinding,
};
use crate::codec::{self, ImportReport, SETTINGS_EXTENSION};
use crate::error::{AppResult, ApplyError, DispatchError, DocumentError, OpenError, SettingsError};
use crate::hardware::device::{bindable_register_names, keys, Command, PortDriver};
use crate::registry::{BindingRegistry, DispatchReport};
use crate::session::{PortSession, SessionChangeEvent};

/// A pending session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    /// Open the named port.
    Select(String),
    /// Close the current port.
    Deselect,
}

/// FIFO of selection requests, shared with session listeners.
///
/// Cloning shares the queue.
#[derive(Debug, Clone, Default)]
pub struct SelectionQueue {
    pending: Rc<RefCell<VecDeque<SelectionRequest>>>,
}

impl SelectionQueue {
    /// Queue a request.
    pub fn push(&self, request: SelectionRequest) {
        self.pending.borrow_mut().push_back(request);
    }

    /// Take the oldest request.
    pub fn pop(&self) -> Option<SelectionRequest> {
        self.pending.borrow_mut().pop_front()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

/// Outcome of one processed selection request.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Event published by the session.
    pub event: SessionChangeEvent,
    /// Outcome of the dispatch that followed.
    pub dispatch: Result<DispatchReport, DispatchError>,
}

impl SessionReport {
    /// Why the requested port could not be opened.
    pub fn open_failure(&self) -> Option<&OpenError> {
        self.event.failure.as_ref()
    }
}

/// Owns the session, the bindings and the apply gate.
pub struct ControlPanel<D: PortDriver> {
    session: PortSession<D>,
    registry: BindingRegistry,
    apply: ApplyCoordinator,
    queue: SelectionQueue,
}

impl<D: PortDriver> ControlPanel<D> {
    /// Panel over `driver` with the given bindings.
    pub fn new(driver: D, registry: BindingRegistry) -> Self {
        Self {
            session: PortSession::new(driver),
            registry,
            apply: ApplyCoordinator::new(),
            queue: SelectionQueue::default(),
        }
    }

    /// Panel with every FSCC binding attached.
    pub fn standard(driver: D) -> Self {
        Self::new(driver, standard_registry())
    }

    /// Current session.
    pub fn session(&self) -> &PortSession<D> {
        &self.session
    }

    /// Attached bindings.
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Mutable access to the attached bindings.
    pub fn registry_mut(&mut self) -> &mut BindingRegistry {
        &mut self.registry
    }

    /// Concrete binding under `key`, if it is a `T`.
    pub fn binding<T: AttributeBinding>(&self, key: &str) -> Option<&T> {
        self.registry.binding(key)
    }

    /// Mutable concrete binding under `key`, if it is a `T`.
    pub fn binding_mut<T: AttributeBinding>(&mut self, key: &str) -> Option<&mut T> {
        self.registry.binding_mut(key)
    }

    /// Whether a port is open and apply is allowed.
    pub fn is_apply_permitted(&self) -> bool {
        self.apply.is_permitted()
    }

    /// Queue handle for listeners that request selections.
    pub fn selection_queue(&self) -> SelectionQueue {
        self.queue.clone()
    }

    /// Listen for session changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionChangeEvent) + 'static) {
        self.session.subscribe(listener);
    }

    /// Open the preferred port when the driver lists it, otherwise the first
    /// listed port.
    pub fn start(&mut self, preferred: Option<&str>) -> AppResult<Vec<SessionReport>> {
        let ports = self.session.available_ports();
        let first = ports.first().ok_or(SettingsError::NoPortsFound)?;
        let port = match preferred {
            Some(name) if ports.iter().any(|p| p == name) => name.to_string(),
            Some(name) => {
                warn!(preferred = name, fallback = %first, "Preferred port not present");
                first.clone()
            }
            None => first.clone(),
        };
        Ok(self.select(&port))
    }

    /// Select a port and process every queued request.
    pub fn select(&mut self, name: &str) -> Vec<SessionReport> {
        self.queue.push(SelectionRequest::Select(name.to_string()));
        self.drain()
    }

    /// Close the current port and process every queued request.
    pub fn deselect(&mut self) -> Vec<SessionReport> {
        self.queue.push(SelectionRequest::Deselect);
        self.drain()
    }

    /// Process queued requests in order, one full dispatch at a time.
    pub fn drain(&mut self) -> Vec<SessionReport> {
        let mut reports = Vec::new();
        while let Some(request) = self.queue.pop() {
            let event = match &request {
                SelectionRequest::Select(name) => self.session.select(name),
                SelectionRequest::Deselect => self.session.deselect(),
            };
            let dispatch = self
                .registry
                .dispatch_session_change(self.session.handle_mut());
            self.apply.on_session_changed(&event);
            reports.push(SessionReport { event, dispatch });
        }
        reports
    }

    /// Push every enabled binding to the open port.
    pub fn apply(&mut self) -> Result<ApplyReport, ApplyError> {
        self.apply
            .request_apply(self.session.handle_mut(), &mut self.registry)
    }

    /// Run a port command on the open port.
    pub fn execute(&mut self, command: Command) -> AppResult<()> {
        let commands = self
            .registry
            .binding::<CommandBinding>(keys::COMMANDS)
            .cloned()
            .unwrap_or_default();
        let handle = self.session.handle_mut().ok_or(SettingsError::NoSession)?;
        commands.execute(handle, command)?;
        Ok(())
    }

    /// Document holding every binding value.
    pub fn export_document(&self) -> Value {
        codec::export_all(&self.registry)
    }

    /// Import a document into the bindings.
    pub fn import_document(&mut self, document: &Value) -> ImportReport {
        codec::import_all(document, &mut self.registry)
    }

    /// Import a settings file.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportReport, DocumentError> {
        let document = codec::load_document(path)?;
        Ok(self.import_document(&document))
    }

    /// Write the current values to `path`, adding the settings extension
    /// when the name has none. Returns the path written.
    pub fn export_file(&self, path: &Path) -> Result<PathBuf, DocumentError> {
        self.export_file_with_extension(path, SETTINGS_EXTENSION)
    }

    /// Like [`ControlPanel::export_file`] with a configured extension.
    pub fn export_file_with_extension(
        &self,
        path: &Path,
        extension: &str,
    ) -> Result<PathBuf, DocumentError> {
        let path = codec::with_settings_extension(path, extension);
        codec::save_document(&path, &self.export_document())?;
        Ok(path)
    }

    /// Import the defaults document at `path`.
    pub fn load_defaults(&mut self, path: &Path) -> Result<ImportReport, DocumentError> {
        let document = codec::load_defaults(path)?;
        info!(path = %path.display(), "Loading defaults");
        Ok(self.import_document(&document))
    }
}

/// Every FSCC binding, in panel order.
pub fn standard_registry() -> BindingRegistry {
    let mut registry = BindingRegistry::new();
    registry.add(FirmwareBinding::new());
    registry.add(FlagBinding::append_status());
    registry.add(FlagBinding::append_timestamp());
    registry.add(FlagBinding::rx_multiple());
    registry.add(FlagBinding::ignore_timeout());
    registry.add(TxModifiersBinding::new());
    registry.add(MemoryCapBinding::new());
    registry.add(ClockFrequencyBinding::new());
    registry.add(CommandBinding::new());
    for name in bindable_register_names() {
        registry.add(RegisterBinding::new(name));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::hardware::device::EDITABLE_REGISTER_NAMES;
    use crate::hardware::mock::{MockPort, MockPortDriver};

    #[test]
    fn standard_registry_covers_every_kind() {
        let registry = standard_registry();
        assert_eq!(registry.len(), 9 + EDITABLE_REGISTER_NAMES.len() - 1);
        assert!(registry.get("registers.CMDR").is_none());
        assert!(registry.get("registers.CCR0").is_some());
    }

    #[test]
    fn start_without_ports_is_reported() {
        let mut panel = ControlPanel::standard(MockPortDriver::new());
        assert!(matches!(panel.start(None), Err(SettingsError::NoPortsFound)));
    }

    #[test]
    fn start_falls_back_to_first_port() {
        let mut panel = ControlPanel::standard(MockPortDriver::demo());
        let reports = panel.start(Some("FSCC9")).unwrap();
        assert_eq!(
            reports[0].event.port.as_ref().map(|p| p.name()),
            Some("FSCC0")
        );
        assert!(panel.is_apply_permitted());
    }

    #[test]
    fn start_opens_the_configured_preferred_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fscc.toml");
        std::fs::write(&path, "[ports]\npreferred = \"FSCC1\"\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        let mut panel = ControlPanel::standard(MockPortDriver::demo());

        let reports = panel.start(config.ports.preferred.as_deref()).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(
            panel.session().current_port().map(|p| p.name()),
            Some("FSCC1")
        );
    }

    #[test]
    fn listener_selection_waits_for_dispatch() {
        let mut panel = ControlPanel::standard(MockPortDriver::demo());
        let queue = panel.selection_queue();
        let mut redirected = false;
        panel.subscribe(move |event| {
            if !redirected && event.is_active() {
                redirected = true;
                queue.push(SelectionRequest::Select("FSCC2".to_string()));
            }
        });

        let reports = panel.select("FSCC0");

        assert_eq!(reports.len(), 2);
        assert!(reports[0].dispatch.is_ok());
        assert_eq!(
            reports[1].event.port.as_ref().map(|p| p.name()),
            Some("FSCC2")
        );
        assert_eq!(panel.session().driver().peak_open_handles(), 1);
        assert!(panel.selection_queue().is_empty());
    }

    #[test]
    fn open_failure_disables_apply() {
        let driver = MockPortDriver::new()
            .with_port(MockPort::current("FSCC0"))
            .with_port(MockPort::current("FSCC1").with_access_denied());
        let mut panel = ControlPanel::standard(driver);
        panel.select("FSCC0");

        let reports = panel.select("FSCC1");

        assert!(matches!(
            reports[0].open_failure(),
            Some(OpenError::AccessDenied { .. })
        ));
        assert!(!panel.is_apply_permitted());
        assert!(matches!(panel.apply(), Err(ApplyError::NotPermitted)));
        assert!(panel
            .registry()
            .iter()
            .all(|binding| !binding.state().is_enabled()));
    }

    #[test]
    fn execute_requires_a_session() {
        let mut panel = ControlPanel::standard(MockPortDriver::demo());
        assert!(matches!(
            panel.execute(Command::Purge),
            Err(SettingsError::NoSession)
        ));

        panel.select("FSCC0");
        panel.execute(Command::Purge).unwrap();
        assert_eq!(panel.session().driver().port("FSCC0").unwrap().purge_count(), 1);
    }
}
