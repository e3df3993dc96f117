//! Error types for the settings engine.
//!
//! Errors fall into the four classes the engine distinguishes:
//!
//! 1. **Capability-unsupported** - [`AttributeError::Unsupported`]
//!    - The device kind lacks the attribute entirely
//!    - Expected and non-fatal: the binding is turned off with a reason
//!
//! 2. **Validation** - [`ValidationError`]
//!    - Operator input that is out of range or malformed
//!    - Reported per field, never written to the device
//!
//! 3. **Transport/device** - [`OpenError`], [`DeviceError`]
//!    - Port not found, access denied, unexpected I/O failure
//!    - Fatal to the current operation and always surfaced to the caller
//!
//! 4. **Document** - [`DocumentError`]
//!    - Unreadable settings file or malformed JSON
//!    - Reported once for the whole import/export
//!
//! [`SettingsError`] consolidates all of them for callers that only need a
//! single error type, with `#[from]` conversions for use with `?`.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Device Errors
// =============================================================================

/// Unexpected failure talking to an open device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The driver reported an I/O fault for this attribute.
    #[error("I/O failure on '{key}': {message}")]
    Io {
        /// Attribute being accessed.
        key: String,
        /// Driver message.
        message: String,
    },

    /// The driver returned a value of the wrong shape for the attribute.
    #[error("Unexpected value for '{key}': {found}")]
    UnexpectedValue {
        /// Attribute being read.
        key: String,
        /// Debug rendering of what the driver returned.
        found: String,
    },

    /// The handle was used after it was closed.
    #[error("Device handle for {port} is closed")]
    Closed {
        /// Port the handle belonged to.
        port: String,
    },
}

impl DeviceError {
    /// I/O fault on `key`.
    pub fn io(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            key: key.into(),
            message: message.into(),
        }
    }

    /// `key` returned a value of the wrong shape.
    pub fn unexpected(key: impl Into<String>, found: impl std::fmt::Debug) -> Self {
        Self::UnexpectedValue {
            key: key.into(),
            found: format!("{found:?}"),
        }
    }
}

/// Outcome of a single attribute read or write that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The attribute is not present on this device kind.
    #[error("'{key}' is not supported on this port")]
    Unsupported {
        /// Missing attribute.
        key: String,
    },

    /// The driver refused the value (e.g. out of the hardware's range).
    #[error("Device rejected value for '{key}': {message}")]
    Rejected {
        /// Attribute being written.
        key: String,
        /// Driver's reason.
        message: String,
    },

    /// Unexpected device failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl AttributeError {
    /// `key` is not present on this device kind.
    pub fn unsupported(key: impl Into<String>) -> Self {
        Self::Unsupported { key: key.into() }
    }

    /// Whether this is a capability mismatch rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AttributeError::Unsupported { .. })
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Why a port could not be opened.
///
/// The variants are kept distinct because each one implies different operator
/// remediation; see [`OpenError::guidance`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The driver does not list the port.
    #[error("Port {port} was not found")]
    NotFound {
        /// Requested port name.
        port: String,
    },

    /// The port exists but the process may not open it.
    #[error("Access to port {port} was denied")]
    AccessDenied {
        /// Requested port name.
        port: String,
    },

    /// The name carries no port number.
    #[error("'{name}' is not a valid port name (expected a trailing port number)")]
    InvalidName {
        /// Name as given.
        name: String,
    },

    /// Any other driver failure while opening.
    #[error("Failed to open port {port}: {source}")]
    Device {
        /// Requested port name.
        port: String,
        /// Underlying failure.
        #[source]
        source: DeviceError,
    },
}

impl OpenError {
    /// Short operator-facing title for the failure.
    pub fn title(&self) -> &'static str {
        match self {
            OpenError::NotFound { .. } | OpenError::Device { .. } => "Problem Opening Port",
            OpenError::AccessDenied { .. } => "Insufficient Permissions",
            OpenError::InvalidName { .. } => "Invalid Port Name",
        }
    }

    /// Remediation text matching the failure cause.
    pub fn guidance(&self) -> &'static str {
        match self {
            OpenError::NotFound { .. } => {
                "There was a problem opening this port. Make sure the port is enabled."
            }
            OpenError::AccessDenied { .. } => {
                "There was a problem opening this port. Make sure you have sufficient permissions."
            }
            OpenError::InvalidName { .. } => {
                "Port names end in the port number, for example FSCC0."
            }
            OpenError::Device { .. } => {
                "The driver reported an unexpected failure. Check the driver is loaded."
            }
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Operator input that cannot be applied.
///
/// Names the offending attribute key, the rejected text and the legal
/// range or format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for '{key}': '{value}' (expected {expected})")]
pub struct ValidationError {
    /// Attribute key of the offending field.
    pub key: String,
    /// Text that was rejected.
    pub value: String,
    /// Legal range or format.
    pub expected: String,
}

impl ValidationError {
    /// Reject `value` for `key`, expecting `expected`.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Failure of a single binding's apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingApplyError {
    /// One or more displayed fields failed validation; nothing was written.
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    /// The device failed the write.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl From<ValidationError> for BindingApplyError {
    fn from(err: ValidationError) -> Self {
        BindingApplyError::Invalid(vec![err])
    }
}

// =============================================================================
// Dispatch / Apply Errors
// =============================================================================

/// A device failure attributed to one binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{key}: {source}")]
pub struct BindingFault {
    /// Key of the binding that failed.
    pub key: String,
    /// Underlying failure.
    #[source]
    pub source: DeviceError,
}

/// Session-change dispatch finished but some bindings hit device failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Session change failed for {} binding(s): {}", .faults.len(), join_faults(.faults))]
pub struct DispatchError {
    /// One entry per failing binding, in registry order.
    pub faults: Vec<BindingFault>,
}

/// Failure of an apply request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Apply was requested with no active session.
    #[error("Apply is not available: no port is open")]
    NotPermitted,

    /// Some fields were rejected; the other bindings were still applied.
    #[error("{} field(s) were not applied: {}", .errors.len(), join_validation(.errors))]
    Rejected {
        /// Keys pushed before the rejection was reported.
        applied: Vec<String>,
        /// Every rejected field.
        errors: Vec<ValidationError>,
    },

    /// At least one binding hit a device failure.
    #[error("Apply failed for {} binding(s): {}", .faults.len(), join_faults(.faults))]
    Device {
        /// Keys pushed successfully.
        applied: Vec<String>,
        /// Fields rejected during the same apply.
        errors: Vec<ValidationError>,
        /// Device failures, one per binding.
        faults: Vec<BindingFault>,
    },
}

impl ApplyError {
    /// Validation errors carried by this failure, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ApplyError::NotPermitted => &[],
            ApplyError::Rejected { errors, .. } | ApplyError::Device { errors, .. } => errors,
        }
    }

    /// Keys that were pushed before the failure was reported.
    pub fn applied(&self) -> &[String] {
        match self {
            ApplyError::NotPermitted => &[],
            ApplyError::Rejected { applied, .. } | ApplyError::Device { applied, .. } => applied,
        }
    }
}

fn join_faults(faults: &[BindingFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Document Errors
// =============================================================================

/// Failure reading or writing a settings document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read or written.
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid JSON.
    #[error("Invalid settings file{}: {source}", display_path(.path))]
    Parse {
        /// Source file, when parsed from one.
        path: Option<PathBuf>,
        /// Parser error with line and column.
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON whose top level is not an object.
    #[error("Invalid settings file{}: top level must be an object", display_path(.path))]
    NotAnObject {
        /// Source file, when parsed from one.
        path: Option<PathBuf>,
    },

    /// No defaults document at the configured location.
    #[error("Defaults file {path} was not found")]
    DefaultsMissing {
        /// Path that was searched.
        path: PathBuf,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

// =============================================================================
// Top-level Error
// =============================================================================

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, SettingsError>;

/// Primary error type for the settings engine.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The configuration loaded but holds invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The driver lists no ports at startup.
    #[error("No FSCC ports were found. Make sure you have a card inserted and the driver loaded.")]
    NoPortsFound,

    /// The operation needs an open port.
    #[error("No port is open")]
    NoSession,

    /// Opening a port failed.
    #[error(transparent)]
    Open(#[from] OpenError),

    /// A session change hit device failures.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Apply failed or was refused.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// A settings document could not be used.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A port command failed.
    #[error("Command failed: {0}")]
    Command(#[from] AttributeError),

    /// The tracing subscriber could not be installed.
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        SettingsError::Config(Box::new(err))
    }
}
