//! Clock generator frequency.
//!
//! The frequency is programmed into the clock generator and cannot be read
//! back, so a session change only clears the field. An empty field means
//! "leave the clock alone" and skips the write on apply.

use serde_json::Value;

use crate::binding::{write_error, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle};
use crate::validation::{clock_frequency_expectation, parse_clock_frequency};

/// Clock generator frequency in Hz, edited as text.
#[derive(Debug, Clone, Default)]
pub struct ClockFrequencyBinding {
    text: String,
    state: BindingState,
}

impl ClockFrequencyBinding {
    /// Clock binding with an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit text; empty means "leave the clock alone".
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the edit text. Validated on apply.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl AttributeBinding for ClockFrequencyBinding {
    fn key(&self) -> &str {
        keys::CLOCK_FREQUENCY
    }

    fn label(&self) -> &str {
        "Clock Frequency"
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        self.text.clone()
    }

    fn pull(&mut self, _session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        self.text.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.text.clear();
    }

    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        if self.text.trim().is_empty() {
            return Ok(());
        }

        let hz = parse_clock_frequency(keys::CLOCK_FREQUENCY, &self.text)?;
        session
            .write_attribute(keys::CLOCK_FREQUENCY, AttributeValue::from(hz))
            .map_err(|err| {
                write_error(
                    keys::CLOCK_FREQUENCY,
                    &self.text,
                    &clock_frequency_expectation(),
                    err,
                )
            })
    }

    /// Integer when the field holds one, the raw text otherwise, nothing when empty.
    fn export_value(&self) -> Option<Value> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        match text.parse::<i64>() {
            Ok(hz) if hz.to_string() == self.text => Some(Value::from(hz)),
            _ => Some(Value::String(self.text.clone())),
        }
    }

    fn import_value(&mut self, fragment: &Value) {
        match fragment {
            Value::Number(n) if n.is_i64() || n.is_u64() => self.text = n.to_string(),
            Value::String(s) => self.text = s.clone(),
            _ => {}
        }
    }
}
