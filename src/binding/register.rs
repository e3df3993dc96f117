//! One binding per editable register, displayed as eight hex digits.

use serde_json::Value;

use crate::binding::{expect_shape, write_error, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle};
use crate::validation::{format_register, parse_int_literal, parse_register_text};

/// One 32-bit register, edited as hex text.
#[derive(Debug, Clone)]
pub struct RegisterBinding {
    name: String,
    key: String,
    text: String,
    state: BindingState,
}

impl RegisterBinding {
    /// Binding for register `name` (e.g. `CCR0`), keyed `registers.<name>`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: keys::register(&name),
            name,
            text: format_register(0),
            state: BindingState::default(),
        }
    }

    /// Register name without the group prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Edit text as displayed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the edit text. Validated on apply.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Set the edit text from a value.
    pub fn set_value(&mut self, value: u32) {
        self.text = format_register(value);
    }
}

impl AttributeBinding for RegisterBinding {
    fn key(&self) -> &str {
        &self.key
    }

    fn label(&self) -> &str {
        &self.name
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

    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        let value = session.read_attribute(&self.key)?;
        let value = expect_shape(&self.key, value, AttributeValue::as_u32)?;
        self.set_value(value);
        Ok(())
    }

    fn clear(&mut self) {
        self.set_value(0);
    }

    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        let value = parse_register_text(&self.key, &self.text)?;
        session
            .write_attribute(&self.key, AttributeValue::from(value))
            .map_err(|err| write_error(&self.key, &self.text, "a writable 32-bit value", err))?;
        self.set_value(value);
        Ok(())
    }

    /// Document form is a `0x`-prefixed hex string.
    fn export_value(&self) -> Option<Value> {
        match parse_register_text(&self.key, &self.text) {
            Ok(value) => Some(Value::String(format!("0x{}", format_register(value)))),
            Err(_) => Some(Value::String(self.text.clone())),
        }
    }

    /// Strings that are not a 32-bit value are kept as edit text and
    /// rejected on apply. Other malformed leaves are ignored.
    fn import_value(&mut self, fragment: &Value) {
        match fragment {
            Value::String(s) => match parse_int_literal(s).and_then(|n| u32::try_from(n).ok()) {
                Some(value) => self.set_value(value),
                None => self.text = s.clone(),
            },
            Value::Number(n) => match n.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(value) => self.set_value(value),
                None => tracing::debug!(key = %self.key, %n, "Ignoring out of range register value"),
            },
            _ => tracing::debug!(key = %self.key, ?fragment, "Ignoring malformed register value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_normalizes_to_eight_hex_digits() {
        let mut reg = RegisterBinding::new("CCR0");
        reg.import_value(&json!("0x1a"));
        assert_eq!(reg.text(), "0000001a");

        reg.import_value(&json!(255));
        assert_eq!(reg.text(), "000000ff");
    }

    #[test]
    fn malformed_import_leaves_value() {
        let mut reg = RegisterBinding::new("BGR");
        reg.set_value(0x10);
        reg.import_value(&json!(-1));
        reg.import_value(&json!(0x1_0000_0000_u64));
        reg.import_value(&json!(1.5));
        reg.import_value(&json!(true));
        reg.import_value(&json!(["0x20"]));
        assert_eq!(reg.text(), "00000010");
    }

    #[test]
    fn unparsable_string_is_kept_as_edit_text() {
        let mut reg = RegisterBinding::new("BGR");
        reg.import_value(&json!("0xZZ"));
        assert_eq!(reg.text(), "0xZZ");
        assert!(parse_register_text(reg.key(), reg.text()).is_err());
    }

    #[test]
    fn export_round_trips_invalid_text() {
        let mut reg = RegisterBinding::new("TCR");
        reg.set_text("not hex");
        assert_eq!(reg.export_value(), Some(json!("not hex")));

        let mut copy = RegisterBinding::new("TCR");
        copy.import_value(&reg.export_value().unwrap());
        assert_eq!(copy.text(), "not hex");

        reg.set_value(0xdead_beef);
        let mut copy = RegisterBinding::new("TCR");
        copy.import_value(&reg.export_value().unwrap());
        assert_eq!(copy.text(), "deadbeef");
    }
}
