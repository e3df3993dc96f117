//! Boolean flag bindings (append status, append timestamp, RX multiple,
//! ignore timeout).

use serde_json::Value;

use crate::binding::{expect_shape, write_error, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle};

/// A checkbox bound to one boolean attribute.
#[derive(Debug, Clone)]
pub struct FlagBinding {
    key: String,
    label: String,
    checked: bool,
    state: BindingState,
}

impl FlagBinding {
    /// Flag bound to the boolean attribute `key`.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            checked: false,
            state: BindingState::default(),
        }
    }

    /// Append the receive status to each frame.
    pub fn append_status() -> Self {
        Self::new(keys::APPEND_STATUS, "Append Status")
    }

    /// Append a timestamp to each frame.
    pub fn append_timestamp() -> Self {
        Self::new(keys::APPEND_TIMESTAMP, "Append Timestamp")
    }

    /// Return multiple frames per read.
    pub fn rx_multiple() -> Self {
        Self::new(keys::RX_MULTIPLE, "RX Multiple")
    }

    /// Ignore the transmit timeout.
    pub fn ignore_timeout() -> Self {
        Self::new(keys::IGNORE_TIMEOUT, "Ignore Timeout")
    }

    /// Displayed state.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Set the displayed state. Pushed on apply.
    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

impl AttributeBinding for FlagBinding {
    fn key(&self) -> &str {
        &self.key
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        self.checked.to_string()
    }

    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        let value = session.read_attribute(&self.key)?;
        self.checked = expect_shape(&self.key, value, AttributeValue::as_bool)?;
        Ok(())
    }

    fn clear(&mut self) {
        self.checked = false;
    }

    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        session
            .write_attribute(&self.key, AttributeValue::Bool(self.checked))
            .map_err(|err| write_error(&self.key, &self.display_value(), "true or false", err))
    }

    fn export_value(&self) -> Option<Value> {
        Some(Value::Bool(self.checked))
    }

    fn import_value(&mut self, fragment: &Value) {
        if let Some(checked) = fragment.as_bool() {
            self.checked = checked;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_ignores_wrong_type() {
        let mut flag = FlagBinding::append_status();
        flag.import_value(&json!(true));
        assert!(flag.is_checked());

        flag.import_value(&json!("yes"));
        assert!(flag.is_checked());
    }

    #[test]
    fn export_round_trips() {
        let mut flag = FlagBinding::ignore_timeout();
        flag.set_checked(true);

        let mut copy = FlagBinding::ignore_timeout();
        copy.import_value(&flag.export_value().unwrap());
        assert_eq!(copy.is_checked(), flag.is_checked());
    }
}
