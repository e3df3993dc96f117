//! Mock Hardware Implementations
//!
//! Simulated FSCC ports for testing and for running the CLI without a card.
//!
//! # Available Mocks
//!
//! - `MockPortDriver` - lists and opens a fixed set of simulated ports
//! - `MockPort` - one simulated port with an attribute table and a write journal
//!
//! Port state lives behind `Rc<RefCell<_>>` so a test can keep a clone of a
//! `MockPort` and observe writes made through handles the session owns. The
//! engine runs on a single logical thread, so no locking is involved.
//!
//! # Device Kinds
//!
//! | Kind | append_timestamp | rx_multiple | memory_cap |
//! |------|------------------|-------------|------------|
//! | `Legacy` | no | no | no |
//! | `Current` | yes | yes | yes |

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::debug;

use crate::error::{AttributeError, DeviceError, OpenError};
use crate::hardware::device::{
    keys, AttributeValue, DeviceHandle, PortDriver, PortId, COMMAND_REGISTER,
    EDITABLE_REGISTER_NAMES, REGISTER_NAMES, WRITE_ONLY_REGISTER_NAMES,
};
use crate::validation::CLOCK_FREQUENCY_RANGE;

/// Power-on register values.
const DEFAULT_REGISTERS: &[(&str, u32)] = &[
    ("FIFOT", 0x0800_1000),
    ("CMDR", 0x0000_0000),
    ("STAR", 0x0000_0000),
    ("CCR0", 0x0011_201c),
    ("CCR1", 0x0000_0018),
    ("CCR2", 0x0000_0000),
    ("BGR", 0x0000_0000),
    ("SSR", 0x0000_007e),
    ("SMR", 0x0000_0000),
    ("TSR", 0x0000_007e),
    ("TMR", 0x0000_0000),
    ("RAR", 0x0000_0000),
    ("RAMR", 0x0000_0000),
    ("PPR", 0x0000_0000),
    ("TCR", 0x0000_0000),
    ("VSTR", 0x0000_0234),
    ("IMR", 0x0f00_0000),
    ("DPLLR", 0x0000_0004),
    ("FCR", 0x0000_0000),
];

const DEFAULT_MEMORY_CAP: i64 = 1_000_000;

// =============================================================================
// Device Kind
// =============================================================================

/// Hardware generation, which decides the attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Older cards without timestamping, multi-frame receive or memory caps.
    Legacy,
    /// Cards supporting every attribute.
    Current,
}

impl DeviceKind {
    /// Whether this kind carries the attribute at all.
    pub fn supports(&self, key: &str) -> bool {
        let newer_only = matches!(
            key,
            keys::APPEND_TIMESTAMP | keys::RX_MULTIPLE | keys::MEMORY_CAP_INPUT | keys::MEMORY_CAP_OUTPUT
        );
        match self {
            DeviceKind::Legacy => !newer_only,
            DeviceKind::Current => true,
        }
    }
}

// =============================================================================
// MockPort
// =============================================================================

#[derive(Debug)]
struct MockPortState {
    kind: DeviceKind,
    attributes: BTreeMap<String, AttributeValue>,
    failing: BTreeSet<String>,
    access_denied: bool,
    writes: Vec<(String, AttributeValue)>,
    purges: u32,
    opens: u32,
    is_open: bool,
}

/// Simulated port.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct MockPort {
    name: String,
    state: Rc<RefCell<MockPortState>>,
}

impl MockPort {
    /// Create a port with power-on defaults for the given kind.
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        let mut attributes = BTreeMap::new();
        for key in [keys::APPEND_STATUS, keys::IGNORE_TIMEOUT] {
            attributes.insert(key.to_string(), AttributeValue::Bool(false));
        }
        attributes.insert(keys::TX_MODIFIERS.to_string(), AttributeValue::Integer(0));
        if kind == DeviceKind::Current {
            for key in [keys::APPEND_TIMESTAMP, keys::RX_MULTIPLE] {
                attributes.insert(key.to_string(), AttributeValue::Bool(false));
            }
            for key in [keys::MEMORY_CAP_INPUT, keys::MEMORY_CAP_OUTPUT] {
                attributes.insert(key.to_string(), AttributeValue::Integer(DEFAULT_MEMORY_CAP));
            }
        }
        for (name, value) in DEFAULT_REGISTERS {
            attributes.insert(keys::register(name), AttributeValue::from(*value));
        }

        Self {
            name: name.into(),
            state: Rc::new(RefCell::new(MockPortState {
                kind,
                attributes,
                failing: BTreeSet::new(),
                access_denied: false,
                writes: Vec::new(),
                purges: 0,
                opens: 0,
                is_open: false,
            })),
        }
    }

    /// Port with every attribute.
    pub fn current(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Current)
    }

    /// Port lacking the newer attributes.
    pub fn legacy(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Legacy)
    }

    /// Preset an attribute value.
    pub fn with_attribute(self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.state
            .borrow_mut()
            .attributes
            .insert(key.to_string(), value.into());
        self
    }

    /// Make reads and writes of `key` fail with an I/O fault.
    pub fn with_failing(self, key: &str) -> Self {
        self.set_failing(key);
        self
    }

    /// Start failing `key` on a port that may already be open.
    pub fn set_failing(&self, key: &str) {
        self.state.borrow_mut().failing.insert(key.to_string());
    }

    /// Make opening this port fail with an access error.
    pub fn with_access_denied(self) -> Self {
        self.state.borrow_mut().access_denied = true;
        self
    }

    /// Port name as listed by the driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hardware generation.
    pub fn kind(&self) -> DeviceKind {
        self.state.borrow().kind
    }

    /// Current device-side value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        self.state.borrow().attributes.get(key).copied()
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(String, AttributeValue)> {
        self.state.borrow().writes.clone()
    }

    /// Successful writes to one key.
    pub fn writes_to(&self, key: &str) -> Vec<AttributeValue> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Number of purges received.
    pub fn purge_count(&self) -> u32 {
        self.state.borrow().purges
    }

    /// Number of times this port has been opened.
    pub fn open_count(&self) -> u32 {
        self.state.borrow().opens
    }

    /// Whether a handle to this port is currently open.
    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open
    }
}

// =============================================================================
// MockPortDriver
// =============================================================================

/// Driver over a fixed set of [`MockPort`]s.
#[derive(Debug, Default)]
pub struct MockPortDriver {
    ports: BTreeMap<String, MockPort>,
    open_handles: Rc<Cell<usize>>,
    peak_open_handles: Rc<Cell<usize>>,
}

impl MockPortDriver {
    /// Driver with no ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Two current cards and one legacy card, as the CLI presents them.
    pub fn demo() -> Self {
        Self::new()
            .with_port(MockPort::current("FSCC0"))
            .with_port(MockPort::current("FSCC1"))
            .with_port(MockPort::legacy("FSCC2"))
    }

    /// Add a port.
    pub fn with_port(mut self, port: MockPort) -> Self {
        self.ports.insert(port.name().to_string(), port);
        self
    }

    /// Shared state of a listed port.
    pub fn port(&self, name: &str) -> Option<&MockPort> {
        self.ports.get(name)
    }

    /// Handles currently open across all ports.
    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }

    /// Largest number of handles that were ever open at once.
    pub fn peak_open_handles(&self) -> usize {
        self.peak_open_handles.get()
    }
}

impl PortDriver for MockPortDriver {
    fn available_ports(&self) -> Vec<String> {
        self.ports.keys().cloned().collect()
    }

    fn open(&self, port: &PortId) -> Result<Box<dyn DeviceHandle>, OpenError> {
        let mock = self
            .ports
            .get(port.name())
            .ok_or_else(|| OpenError::NotFound {
                port: port.name().to_string(),
            })?;

        {
            let mut state = mock.state.borrow_mut();
            if state.access_denied {
                return Err(OpenError::AccessDenied {
                    port: port.name().to_string(),
                });
            }
            if state.is_open {
                return Err(OpenError::Device {
                    port: port.name().to_string(),
                    source: DeviceError::io("open", "port is already open"),
                });
            }
            state.is_open = true;
            state.opens += 1;
        }

        let open = self.open_handles.get() + 1;
        self.open_handles.set(open);
        self.peak_open_handles
            .set(self.peak_open_handles.get().max(open));
        debug!(port = %port, open_handles = open, "MockPortDriver: opened");

        Ok(Box::new(MockHandle {
            port: port.clone(),
            state: Rc::clone(&mock.state),
            open_handles: Rc::clone(&self.open_handles),
            closed: false,
        }))
    }
}

// =============================================================================
// MockHandle
// =============================================================================

struct MockHandle {
    port: PortId,
    state: Rc<RefCell<MockPortState>>,
    open_handles: Rc<Cell<usize>>,
    closed: bool,
}

impl MockHandle {
    fn ensure_open(&self) -> Result<(), DeviceError> {
        if self.closed {
            Err(DeviceError::Closed {
                port: self.port.name().to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.borrow_mut().is_open = false;
            self.open_handles
                .set(self.open_handles.get().saturating_sub(1));
        }
    }

    fn check_supported(&self, key: &str) -> Result<(), AttributeError> {
        let state = self.state.borrow();
        if state.failing.contains(key) {
            return Err(DeviceError::io(key, "simulated I/O fault").into());
        }
        if !state.kind.supports(key) {
            return Err(AttributeError::unsupported(key));
        }
        Ok(())
    }
}

fn register_name(key: &str) -> Option<&str> {
    key.strip_prefix(keys::REGISTERS)
        .and_then(|rest| rest.strip_prefix('.'))
}

fn rejected(key: &str, message: impl Into<String>) -> AttributeError {
    AttributeError::Rejected {
        key: key.to_string(),
        message: message.into(),
    }
}

impl DeviceHandle for MockHandle {
    fn port(&self) -> &PortId {
        &self.port
    }

    fn read_attribute(&mut self, key: &str) -> Result<AttributeValue, AttributeError> {
        self.ensure_open()?;
        self.check_supported(key)?;

        if let Some(name) = register_name(key) {
            if WRITE_ONLY_REGISTER_NAMES.contains(&name) || !REGISTER_NAMES.contains(&name) {
                return Err(AttributeError::unsupported(key));
            }
        }
        if key == keys::CLOCK_FREQUENCY {
            // Clock generator is programmed, not read back.
            return Err(AttributeError::unsupported(key));
        }

        self.state
            .borrow()
            .attributes
            .get(key)
            .copied()
            .ok_or_else(|| AttributeError::unsupported(key))
    }

    fn write_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), AttributeError> {
        self.ensure_open()?;
        self.check_supported(key)?;

        if let Some(name) = register_name(key) {
            if !REGISTER_NAMES.contains(&name) {
                return Err(AttributeError::unsupported(key));
            }
            if !EDITABLE_REGISTER_NAMES.contains(&name) {
                return Err(rejected(key, "register is read-only"));
            }
            if value.as_u32().is_none() {
                return Err(rejected(key, "register values are 32-bit unsigned"));
            }
        }

        match key {
            keys::CLOCK_FREQUENCY => {
                let in_range = value
                    .as_integer()
                    .and_then(|hz| u32::try_from(hz).ok())
                    .is_some_and(|hz| CLOCK_FREQUENCY_RANGE.contains(&hz));
                if !in_range {
                    return Err(rejected(key, "frequency out of range"));
                }
            }
            keys::MEMORY_CAP_INPUT | keys::MEMORY_CAP_OUTPUT => {
                if !value.as_integer().is_some_and(|n| n >= 0) {
                    return Err(rejected(key, "memory cap must be non-negative"));
                }
            }
            keys::TX_MODIFIERS => {
                if value.as_u32().is_none() {
                    return Err(rejected(key, "expected a bitmask"));
                }
            }
            keys::APPEND_STATUS | keys::APPEND_TIMESTAMP | keys::RX_MULTIPLE | keys::IGNORE_TIMEOUT => {
                if value.as_bool().is_none() {
                    return Err(rejected(key, "expected a boolean"));
                }
            }
            _ if register_name(key).is_some() => {}
            _ => return Err(AttributeError::unsupported(key)),
        }

        let mut state = self.state.borrow_mut();
        // Command register bits are strobes, not state.
        if register_name(key) != Some(COMMAND_REGISTER) {
            state.attributes.insert(key.to_string(), value);
        }
        state.writes.push((key.to_string(), value));
        Ok(())
    }

    fn purge(&mut self) -> Result<(), AttributeError> {
        self.ensure_open()?;
        self.state.borrow_mut().purges += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.release();
        debug!(port = %self.port, "MockPortDriver: closed");
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.release();
    }
}
