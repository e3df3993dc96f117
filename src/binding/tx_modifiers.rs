//! Transmit modifiers: trigger selection plus frame repeat.
//!
//! Encoded on the device as a bitmask of [`XREP`], [`TXT`] and [`TXEXT`].
//! Repeating frames cannot be combined with transmitting on an external
//! signal.

use serde_json::Value;

use crate::binding::{expect_shape, write_error, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError, ValidationError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle, TXEXT, TXT, XREP};

/// When a written frame is transmitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransmitTrigger {
    /// Transmit as soon as data is written.
    #[default]
    OnWrite,
    /// Transmit on the timer.
    OnTimer,
    /// Transmit on the external signal.
    OnExternalSignal,
}

impl TransmitTrigger {
    /// Every trigger, in display order.
    pub const ALL: [TransmitTrigger; 3] = [
        TransmitTrigger::OnWrite,
        TransmitTrigger::OnTimer,
        TransmitTrigger::OnExternalSignal,
    ];

    /// Operator-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            TransmitTrigger::OnWrite => "Write (Default)",
            TransmitTrigger::OnTimer => "Timer",
            TransmitTrigger::OnExternalSignal => "External Signal",
        }
    }

    /// TXT/TXEXT bits selecting this trigger.
    pub fn bits(&self) -> u32 {
        match self {
            TransmitTrigger::OnWrite => 0,
            TransmitTrigger::OnTimer => TXT,
            TransmitTrigger::OnExternalSignal => TXEXT,
        }
    }
}

/// Transmit trigger selection plus the repeat-frames flag.
#[derive(Debug, Clone, Default)]
pub struct TxModifiersBinding {
    trigger: TransmitTrigger,
    repeat: bool,
    state: BindingState,
}

impl TxModifiersBinding {
    /// Transmit on write, no repeat.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected trigger.
    pub fn trigger(&self) -> TransmitTrigger {
        self.trigger
    }

    /// Whether frames repeat.
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Enabling repeat while on external signal falls back to on-write.
    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
        if repeat && self.trigger == TransmitTrigger::OnExternalSignal {
            self.trigger = TransmitTrigger::OnWrite;
        }
    }

    /// Select a trigger. External signal is refused while repeat is set.
    pub fn set_trigger(&mut self, trigger: TransmitTrigger) -> Result<(), ValidationError> {
        if self.repeat && trigger == TransmitTrigger::OnExternalSignal {
            return Err(ValidationError::new(
                keys::TX_MODIFIERS,
                trigger.label(),
                "Write or Timer while Repeat Frames is set",
            ));
        }
        self.trigger = trigger;
        Ok(())
    }

    /// Triggers selectable in the current repeat state.
    pub fn available_triggers(&self) -> Vec<TransmitTrigger> {
        TransmitTrigger::ALL
            .into_iter()
            .filter(|t| !(self.repeat && *t == TransmitTrigger::OnExternalSignal))
            .collect()
    }

    /// Bitmask written to `tx_modifiers`.
    pub fn bits(&self) -> u32 {
        let repeat = if self.repeat { XREP } else { 0 };
        repeat | self.trigger.bits()
    }

    /// Decode a bitmask. External signal wins over timer unless repeat is set.
    pub fn set_bits(&mut self, bits: u32) {
        self.trigger = TransmitTrigger::OnWrite;
        self.set_repeat(bits & XREP != 0);
        if bits & TXT != 0 {
            self.trigger = TransmitTrigger::OnTimer;
        }
        if bits & TXEXT != 0 && !self.repeat {
            self.trigger = TransmitTrigger::OnExternalSignal;
        }
    }
}

impl AttributeBinding for TxModifiersBinding {
    fn key(&self) -> &str {
        keys::TX_MODIFIERS
    }

    fn label(&self) -> &str {
        "Transmit Modifiers"
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        format!(
            "Transmit On: {}, Repeat Frames: {}",
            self.trigger.label(),
            self.repeat
        )
    }

    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        let value = session.read_attribute(keys::TX_MODIFIERS)?;
        let bits = expect_shape(keys::TX_MODIFIERS, value, AttributeValue::as_u32)?;
        self.set_bits(bits);
        Ok(())
    }

    fn clear(&mut self) {
        self.trigger = TransmitTrigger::OnWrite;
        self.repeat = false;
    }

    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        let bits = self.bits();
        session
            .write_attribute(keys::TX_MODIFIERS, AttributeValue::from(bits))
            .map_err(|err| {
                write_error(keys::TX_MODIFIERS, &format!("{bits:#x}"), "a transmit modifier mask", err)
            })
    }

    fn export_value(&self) -> Option<Value> {
        Some(Value::from(self.bits()))
    }

    fn import_value(&mut self, fragment: &Value) {
        if let Some(bits) = fragment.as_u64().and_then(|n| u32::try_from(n).ok()) {
            self.set_bits(bits);
        }
    }
}
