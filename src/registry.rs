//! Binding registry: the ordered set of attached bindings and the
//! session-change dispatch that drives their lifecycle.
//!
//! Dispatch runs in two phases. Every binding is first detached (disabled
//! and cleared), then each one pulls from the new session. A value from the
//! previous session is therefore never visible next to a value from the new
//! one.

use tracing::{debug, info, info_span, warn};

use crate::binding::{AttributeBinding, CapabilityOutcome};
use crate::error::{BindingFault, DispatchError};
use crate::hardware::device::DeviceHandle;

/// Per-binding outcome of one session-change dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Whether a session was present.
    pub active: bool,
    /// Keys pulled successfully.
    pub supported: Vec<String>,
    /// Keys absent on the port.
    pub unsupported: Vec<String>,
}

/// Ordered set of attached bindings.
#[derive(Default)]
pub struct BindingRegistry {
    bindings: Vec<Box<dyn AttributeBinding>>,
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BindingRegistry {
    /// Registry with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a binding. A binding with the same key is replaced in place.
    pub fn add(&mut self, binding: impl AttributeBinding) {
        let binding: Box<dyn AttributeBinding> = Box::new(binding);
        match self.position(binding.key()) {
            Some(index) => {
                warn!(key = binding.key(), "Replacing binding with duplicate key");
                self.bindings[index] = binding;
            }
            None => self.bindings.push(binding),
        }
    }

    /// Number of attached bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no binding is attached.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Attribute keys in attachment order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.iter().map(|binding| binding.key())
    }

    /// Bindings in attach order.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn AttributeBinding + 'static)> + '_ {
        self.bindings.iter().map(|binding| &**binding)
    }

    /// Mutable bindings in attach order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn AttributeBinding + 'static)> + '_ {
        self.bindings.iter_mut().map(|binding| &mut **binding)
    }

    /// Binding under `key`.
    pub fn get(&self, key: &str) -> Option<&dyn AttributeBinding> {
        let binding = self.bindings.iter().find(|binding| binding.key() == key)?;
        Some(&**binding)
    }

    /// Mutable binding under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut dyn AttributeBinding> {
        let binding = self.bindings.iter_mut().find(|binding| binding.key() == key)?;
        Some(&mut **binding)
    }

    /// Concrete binding under `key`, if it is a `T`.
    pub fn binding<T: AttributeBinding>(&self, key: &str) -> Option<&T> {
        self.get(key)?.as_any().downcast_ref::<T>()
    }

    /// Mutable concrete binding under `key`, if it is a `T`.
    pub fn binding_mut<T: AttributeBinding>(&mut self, key: &str) -> Option<&mut T> {
        self.get_mut(key)?.as_any_mut().downcast_mut::<T>()
    }

    /// Drive every binding through a session transition.
    ///
    /// Each binding is visited exactly once. Unsupported attributes disable
    /// only their own binding. Device failures are collected and returned
    /// after every binding has been attempted.
    pub fn dispatch_session_change(
        &mut self,
        session: Option<&mut dyn DeviceHandle>,
    ) -> Result<DispatchReport, DispatchError> {
        let port = session.as_ref().map(|handle| handle.port().to_string());
        let _span = info_span!("dispatch_session_change", port = port.as_deref()).entered();

        for binding in &mut self.bindings {
            binding.clear();
            binding.state_mut().mark_inactive();
        }

        let Some(handle) = session else {
            info!(bindings = self.bindings.len(), "Bindings detached");
            return Ok(DispatchReport::default());
        };

        let mut report = DispatchReport {
            active: true,
            ..DispatchReport::default()
        };
        let mut faults = Vec::new();

        for binding in &mut self.bindings {
            let key = binding.key().to_string();
            match binding.on_session_changed(Some(&mut *handle)) {
                Ok(CapabilityOutcome::Supported) => {
                    debug!(key = %key, value = %binding.display_value(), "Binding pulled");
                    report.supported.push(key);
                }
                Ok(CapabilityOutcome::Unsupported) => {
                    warn!(key = %key, "Attribute not supported on this port");
                    report.unsupported.push(key);
                }
                Ok(CapabilityOutcome::Inactive) => {}
                Err(source) => {
                    warn!(key = %key, error = %source, "Binding pull failed");
                    faults.push(BindingFault { key, source });
                }
            }
        }

        info!(
            supported = report.supported.len(),
            unsupported = report.unsupported.len(),
            failed = faults.len(),
            "Session change dispatched"
        );

        if faults.is_empty() {
            Ok(report)
        } else {
            Err(DispatchError { faults })
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.bindings.iter().position(|binding| binding.key() == key)
    }
}
