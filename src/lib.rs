//! # FSCC Settings Library
//!
//! Capability-aware attribute binding and synchronization for Fastcom FSCC
//! serial ports. A variable set of configuration controls attaches to a port
//! session, discovers which attributes the card supports, pulls the current
//! device state, pushes edited values back and round-trips a full snapshot
//! through `.fscc` settings files.
//!
//! ## Crate Structure
//!
//! - **`hardware`**: The device seam (`PortDriver`, `DeviceHandle`, attribute
//!   keys) and a simulated driver used by the tests and the CLI.
//! - **`session`**: `PortSession`, the single owner of the open device handle.
//! - **`binding`**: The `AttributeBinding` contract and every concrete binding
//!   kind (flags, registers, clock frequency, memory cap, transmit modifiers,
//!   firmware, commands).
//! - **`registry`**: `BindingRegistry` and session-change dispatch.
//! - **`apply`**: `ApplyCoordinator`, which gates and fans out apply.
//! - **`codec`**: Settings document export/import and file I/O.
//! - **`validation`**: Input parsing and range rules for binding fields.
//! - **`panel`**: `ControlPanel`, the composition root a UI drives.
//! - **`error`**: The error taxonomy, consolidated in `SettingsError`.
//! - **`config`**: Figment-based application configuration.
//! - **`logging`**: `tracing-subscriber` setup.

pub mod apply;
pub mod binding;
pub mod codec;
pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod panel;
pub mod registry;
pub mod session;
pub mod validation;
