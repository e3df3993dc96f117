//! Device Seam
//!
//! The hardware driver is an external collaborator. This module defines the
//! narrow interface the settings engine needs from it:
//!
//! - [`PortDriver`] - lists and opens ports
//! - [`DeviceHandle`] - one open port with attribute read/write
//!
//! # Attribute Keys
//!
//! Attributes are addressed by stable string keys. Grouped attributes use
//! dotted keys that mirror the settings document layout:
//!
//! | Key | Value | Notes |
//! |-----|-------|-------|
//! | `append_status` | bool | |
//! | `append_timestamp` | bool | newer cards only |
//! | `rx_multiple` | bool | newer cards only |
//! | `ignore_timeout` | bool | |
//! | `tx_modifiers` | integer | XREP / TXT / TXEXT bitmask |
//! | `clock_frequency` | integer | write-only, Hz |
//! | `memory_cap.input` | integer | bytes |
//! | `memory_cap.output` | integer | bytes |
//! | `registers.<NAME>` | integer | 32-bit register |

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AttributeError, DeviceError, OpenError};

// =============================================================================
// Keys and Constants
// =============================================================================

pub mod keys {
    //! Well-known attribute keys.

    /// Append receive status to frames.
    pub const APPEND_STATUS: &str = "append_status";
    /// Append a timestamp to frames.
    pub const APPEND_TIMESTAMP: &str = "append_timestamp";
    /// Return multiple frames per read.
    pub const RX_MULTIPLE: &str = "rx_multiple";
    /// Ignore the transmit timeout.
    pub const IGNORE_TIMEOUT: &str = "ignore_timeout";
    /// Transmit modifier bitmask.
    pub const TX_MODIFIERS: &str = "tx_modifiers";
    /// Clock generator frequency in Hz. Write-only.
    pub const CLOCK_FREQUENCY: &str = "clock_frequency";
    /// Group holding the memory-cap leaves.
    pub const MEMORY_CAP: &str = "memory_cap";
    /// Input memory cap in bytes.
    pub const MEMORY_CAP_INPUT: &str = "memory_cap.input";
    /// Output memory cap in bytes.
    pub const MEMORY_CAP_OUTPUT: &str = "memory_cap.output";
    /// Group holding one key per register.
    pub const REGISTERS: &str = "registers";
    /// Firmware version display.
    pub const FIRMWARE: &str = "firmware";
    /// Stateless port commands.
    pub const COMMANDS: &str = "commands";

    /// Attribute key for a named register (`registers.CCR0`).
    pub fn register(name: &str) -> String {
        format!("{REGISTERS}.{name}")
    }
}

/// Every register on the card, in address order.
pub const REGISTER_NAMES: &[&str] = &[
    "FIFOT", "CMDR", "STAR", "CCR0", "CCR1", "CCR2", "BGR", "SSR", "SMR", "TSR", "TMR", "RAR",
    "RAMR", "PPR", "TCR", "VSTR", "IMR", "DPLLR", "FCR",
];

/// Registers the driver accepts writes to.
pub const EDITABLE_REGISTER_NAMES: &[&str] = &[
    "FIFOT", "CMDR", "CCR0", "CCR1", "CCR2", "BGR", "SSR", "SMR", "TSR", "TMR", "RAR", "RAMR",
    "PPR", "TCR", "IMR", "DPLLR", "FCR",
];

/// Editable registers that cannot be read back and so never get a binding.
pub const WRITE_ONLY_REGISTER_NAMES: &[&str] = &["CMDR"];

/// Version register, source of the firmware display.
pub const VERSION_REGISTER: &str = "VSTR";

/// Command register written by [`Command::StartTimer`] / [`Command::StopTimer`].
pub const COMMAND_REGISTER: &str = "CMDR";

/// Transmit repeat.
pub const XREP: u32 = 0x01;
/// Transmit on timer.
pub const TXT: u32 = 0x02;
/// Transmit on external signal.
pub const TXEXT: u32 = 0x04;

/// CMDR: start timer.
pub const CMDR_TIMR: u32 = 0x0000_0001;
/// CMDR: stop timer.
pub const CMDR_STIMR: u32 = 0x0000_0002;

/// Registers that get an editable binding: editable minus write-only.
pub fn bindable_register_names() -> impl Iterator<Item = &'static str> {
    EDITABLE_REGISTER_NAMES
        .iter()
        .copied()
        .filter(|name| !WRITE_ONLY_REGISTER_NAMES.contains(name))
}

// =============================================================================
// Values
// =============================================================================

/// A scalar attribute value as exchanged with the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Flag attribute.
    Bool(bool),
    /// Register, count or bitmask attribute.
    Integer(i64),
}

impl AttributeValue {
    /// Boolean value, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::Integer(_) => None,
        }
    }

    /// Integer value, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(n) => Some(*n),
            AttributeValue::Bool(_) => None,
        }
    }

    /// Integer value that fits a 32-bit register.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_integer().and_then(|n| u32::try_from(n).ok())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

// =============================================================================
// Port Identification
// =============================================================================

#[allow(clippy::unwrap_used)]
static PORT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)$").unwrap());

/// Operator-facing port name plus the port number the driver opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortId {
    name: String,
    number: u32,
}

impl PortId {
    /// Parse a port name such as `FSCC0` or `/dev/fscc3`.
    ///
    /// The port number is taken from the trailing digits of the name.
    pub fn parse(name: &str) -> Result<Self, OpenError> {
        let name = name.trim();
        let number = PORT_NUMBER
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| OpenError::InvalidName {
                name: name.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            number,
        })
    }

    /// Operator-facing name, e.g. `FSCC0`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port number taken from the name.
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// Driver Traits
// =============================================================================

/// Stateless commands a port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear the transmit and receive buffers.
    Purge,
    /// Start the transmit timer.
    StartTimer,
    /// Stop the transmit timer.
    StopTimer,
}

impl Command {
    /// Operator-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Purge => "Purge",
            Command::StartTimer => "Start Timer",
            Command::StopTimer => "Stop Timer",
        }
    }
}

/// One open port.
///
/// All calls are synchronous and bounded by the driver. Reads and writes of
/// attributes the device kind lacks return [`AttributeError::Unsupported`];
/// any other failure is a [`AttributeError::Device`] and must not be treated
/// as missing support.
pub trait DeviceHandle {
    /// Port this handle was opened for.
    fn port(&self) -> &PortId;

    /// Read the current value of `key`.
    fn read_attribute(&mut self, key: &str) -> Result<AttributeValue, AttributeError>;

    /// Write `value` to `key`.
    fn write_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), AttributeError>;

    /// Clear the transmit and receive buffers.
    fn purge(&mut self) -> Result<(), AttributeError> {
        Err(AttributeError::unsupported("purge"))
    }

    /// Release the device. Further calls fail with [`DeviceError::Closed`].
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// Opens ports on behalf of [`crate::session::PortSession`].
pub trait PortDriver {
    /// Port names currently present, sorted.
    fn available_ports(&self) -> Vec<String>;

    /// Open `port` for exclusive use.
    fn open(&self, port: &PortId) -> Result<Box<dyn DeviceHandle>, OpenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_id_takes_trailing_number() {
        let port = PortId::parse("FSCC12").unwrap();
        assert_eq!(port.name(), "FSCC12");
        assert_eq!(port.number(), 12);

        let port = PortId::parse("/dev/fscc3").unwrap();
        assert_eq!(port.number(), 3);
    }

    #[test]
    fn port_id_without_number_is_rejected() {
        assert!(matches!(
            PortId::parse("FSCC"),
            Err(OpenError::InvalidName { .. })
        ));
    }

    #[test]
    fn write_only_registers_are_not_bindable() {
        let names: Vec<_> = bindable_register_names().collect();
        assert!(!names.contains(&"CMDR"));
        assert!(!names.contains(&"VSTR"));
        assert!(names.contains(&"CCR0"));
        assert_eq!(names.len(), EDITABLE_REGISTER_NAMES.len() - 1);
    }

    #[test]
    fn attribute_value_accessors_check_shape() {
        assert_eq!(AttributeValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttributeValue::Bool(true).as_integer(), None);
        assert_eq!(AttributeValue::Integer(-1).as_u32(), None);
        assert_eq!(AttributeValue::Integer(0x1a).as_u32(), Some(0x1a));
    }
}
