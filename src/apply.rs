//! Apply coordinator: gates apply on an active session and fans the push
//! out to every enabled binding.
//!
//! Apply is not transactional. Bindings that were pushed before another one
//! failed stay applied; the failure lists every rejected field.

use tracing::{debug, info, info_span, warn};

use crate::error::{ApplyError, BindingApplyError, BindingFault};
use crate::hardware::device::DeviceHandle;
use crate::registry::BindingRegistry;
use crate::session::SessionChangeEvent;

/// Keys pushed by a fully successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Keys pushed, in registry order.
    pub applied: Vec<String>,
}

/// Gates apply on an active session and pushes every enabled binding.
#[derive(Debug, Default)]
pub struct ApplyCoordinator {
    permitted: bool,
}

impl ApplyCoordinator {
    /// Coordinator with apply refused until a session opens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply is permitted exactly while a session is active.
    pub fn on_session_changed(&mut self, event: &SessionChangeEvent) {
        self.permitted = event.is_active();
    }

    /// Whether an apply request would be accepted.
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Push every enabled binding, collecting all failures.
    pub fn request_apply(
        &self,
        session: Option<&mut dyn DeviceHandle>,
        registry: &mut BindingRegistry,
    ) -> Result<ApplyReport, ApplyError> {
        let handle = match session {
            Some(handle) if self.permitted => handle,
            _ => return Err(ApplyError::NotPermitted),
        };
        let _span = info_span!("apply", port = %handle.port()).entered();

        let mut applied = Vec::new();
        let mut errors = Vec::new();
        let mut faults = Vec::new();

        for binding in registry.iter_mut() {
            if !binding.state().is_enabled() {
                continue;
            }
            let key = binding.key().to_string();
            match binding.on_apply(&mut *handle) {
                Ok(()) => {
                    debug!(key = %key, "Binding applied");
                    applied.push(key);
                }
                Err(BindingApplyError::Invalid(invalid)) => {
                    for err in &invalid {
                        warn!(key = %err.key, value = %err.value, "Rejected field");
                    }
                    errors.extend(invalid);
                }
                Err(BindingApplyError::Device(source)) => {
                    warn!(key = %key, error = %source, "Apply failed");
                    faults.push(BindingFault { key, source });
                }
            }
        }

        info!(
            applied = applied.len(),
            rejected = errors.len(),
            failed = faults.len(),
            "Apply finished"
        );

        if !faults.is_empty() {
            Err(ApplyError::Device {
                applied,
                errors,
                faults,
            })
        } else if !errors.is_empty() {
            Err(ApplyError::Rejected { applied, errors })
        } else {
            Ok(ApplyReport { applied })
        }
    }
}
