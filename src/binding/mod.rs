//! Attribute Bindings
//!
//! A binding pairs one displayed value with one device attribute. Every
//! configuration control implements [`AttributeBinding`]; the registry drives
//! all of them through the same lifecycle:
//!
//! ```text
//!   session change ──► on_session_changed(Some(handle)) ──► pull ──► Supported / Unsupported / error
//!                 └──► on_session_changed(None) ──────────────────► disabled, cleared
//!   apply ──────────► on_apply(handle)   (enabled bindings only)
//!   export/import ──► export_value / import_value   (never touch the device)
//! ```
//!
//! Bindings never store the session. The handle is borrowed for the duration
//! of one call, so a binding cannot act on a port that has since been closed.
//!
//! # Capability Outcome
//!
//! A pull reports through [`AttributeError`]:
//! - `Unsupported` - the device kind lacks the attribute; the binding is
//!   disabled with [`UNSUPPORTED_REASON`]
//! - `Device` / `Rejected` - an unexpected failure; the binding is disabled
//!   and the error propagates to the caller

use std::any::Any;

use serde_json::Value;

use crate::error::{AttributeError, BindingApplyError, DeviceError, ValidationError};
use crate::hardware::device::{AttributeValue, DeviceHandle};

pub mod clock;
pub mod commands;
pub mod firmware;
pub mod flag;
pub mod memory_cap;
pub mod register;
pub mod tx_modifiers;

pub use clock::ClockFrequencyBinding;
pub use commands::CommandBinding;
pub use firmware::FirmwareBinding;
pub use flag::FlagBinding;
pub use memory_cap::MemoryCapBinding;
pub use register::RegisterBinding;
pub use tx_modifiers::{TransmitTrigger, TxModifiersBinding};

/// Reason shown on a binding whose attribute the port lacks.
pub const UNSUPPORTED_REASON: &str = "This feature is not supported on this port.";

// =============================================================================
// Binding State
// =============================================================================

/// Classification of a session transition for one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityOutcome {
    /// No session; the binding is disabled and cleared.
    Inactive,
    /// The attribute was read and the binding is enabled.
    Supported,
    /// The device kind lacks the attribute.
    Unsupported,
}

impl CapabilityOutcome {
    /// Classify a pull result.
    ///
    /// Only [`AttributeError::Unsupported`] maps to `Unsupported`. Every other
    /// failure is returned as an error.
    pub fn classify(result: Result<(), AttributeError>) -> Result<Self, DeviceError> {
        match result {
            Ok(()) => Ok(CapabilityOutcome::Supported),
            Err(AttributeError::Unsupported { .. }) => Ok(CapabilityOutcome::Unsupported),
            Err(AttributeError::Device(err)) => Err(err),
            Err(AttributeError::Rejected { key, message }) => Err(DeviceError::Io { key, message }),
        }
    }
}

/// Enabled/disabled state shared by every binding kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    enabled: bool,
    unsupported_reason: Option<String>,
    failure: Option<String>,
}

impl BindingState {
    /// Whether the binding may be edited and applied.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set when the binding is disabled because the port lacks the attribute.
    pub fn unsupported_reason(&self) -> Option<&str> {
        self.unsupported_reason.as_deref()
    }

    /// Set when the last pull failed unexpectedly.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Text for a tooltip: the unsupported reason or the failure, if any.
    pub fn reason(&self) -> Option<&str> {
        self.unsupported_reason().or(self.failure())
    }

    /// No session: disabled, no reason.
    pub fn mark_inactive(&mut self) {
        *self = Self::default();
    }

    /// Attribute present on the open port.
    pub fn mark_supported(&mut self) {
        self.enabled = true;
        self.unsupported_reason = None;
        self.failure = None;
    }

    /// Attribute absent on this device kind.
    pub fn mark_unsupported(&mut self) {
        self.enabled = false;
        self.unsupported_reason = Some(UNSUPPORTED_REASON.to_string());
        self.failure = None;
    }

    /// Pull failed with a device error.
    pub fn mark_failed(&mut self, error: &DeviceError) {
        self.enabled = false;
        self.unsupported_reason = None;
        self.failure = Some(error.to_string());
    }
}

// =============================================================================
// AttributeBinding
// =============================================================================

/// Downcasting support so callers can reach a concrete binding in a registry.
pub trait AsAny: Any {
    /// Upcast for concrete-type access.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for concrete-type access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle contract every configuration control implements.
///
/// Implementors provide the kind-specific `pull`, `clear`, `push` and value
/// conversion; the provided `on_session_changed` / `on_apply` apply the
/// shared enable/disable rules.
pub trait AttributeBinding: AsAny {
    /// Stable attribute key, dotted for grouped attributes (`memory_cap`,
    /// `registers.CCR0`).
    fn key(&self) -> &str;

    /// Operator-facing label.
    fn label(&self) -> &str;

    /// Enabled state and unsupported reason.
    fn state(&self) -> &BindingState;

    /// Mutable access for the lifecycle defaults.
    fn state_mut(&mut self) -> &mut BindingState;

    /// Current displayed value, as the UI would render it.
    fn display_value(&self) -> String;

    /// Read the device's current value into the displayed value.
    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError>;

    /// Reset the displayed value to its empty state.
    fn clear(&mut self);

    /// Validate the displayed value and write it to the device.
    ///
    /// Must not write anything when validation fails.
    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError>;

    /// Serializable form of the displayed value; `None` for stateless bindings.
    fn export_value(&self) -> Option<Value>;

    /// Set the displayed value from a document fragment.
    ///
    /// Never touches the device. Fields that are missing or of the wrong
    /// type leave the corresponding displayed value unchanged.
    fn import_value(&mut self, fragment: &Value);

    /// React to a session transition.
    ///
    /// With no session the binding is disabled and cleared. With a session
    /// the binding pulls its attribute and is enabled or marked unsupported.
    /// Any other pull failure disables the binding and is returned.
    fn on_session_changed(
        &mut self,
        session: Option<&mut dyn DeviceHandle>,
    ) -> Result<CapabilityOutcome, DeviceError> {
        self.clear();
        let Some(session) = session else {
            self.state_mut().mark_inactive();
            return Ok(CapabilityOutcome::Inactive);
        };

        match CapabilityOutcome::classify(self.pull(session)) {
            Ok(CapabilityOutcome::Supported) => {
                self.state_mut().mark_supported();
                Ok(CapabilityOutcome::Supported)
            }
            Ok(outcome) => {
                self.clear();
                self.state_mut().mark_unsupported();
                Ok(outcome)
            }
            Err(err) => {
                self.clear();
                self.state_mut().mark_failed(&err);
                Err(err)
            }
        }
    }

    /// Push the displayed value. Only called on enabled bindings.
    fn on_apply(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        self.push(session)
    }
}

/// Map a write failure to the binding-level apply error.
///
/// A device-side rejection becomes a validation error for `key` carrying
/// `expected`; an unsupported write on an enabled binding is unexpected and
/// is reported as a device error.
pub(crate) fn write_error(
    key: &str,
    value: &str,
    expected: &str,
    err: AttributeError,
) -> BindingApplyError {
    match err {
        AttributeError::Rejected { .. } => ValidationError::new(key, value, expected).into(),
        AttributeError::Unsupported { key } => {
            BindingApplyError::Device(DeviceError::io(key, "attribute became unsupported"))
        }
        AttributeError::Device(err) => BindingApplyError::Device(err),
    }
}

/// Extract the expected shape from a read value, or fail with
/// [`DeviceError::UnexpectedValue`].
pub(crate) fn expect_shape<T>(
    key: &str,
    value: AttributeValue,
    extract: impl FnOnce(&AttributeValue) -> Option<T>,
) -> Result<T, AttributeError> {
    extract(&value).ok_or_else(|| DeviceError::unexpected(key, value).into())
}
