//! Read-only firmware version display, decoded from the version register.

use serde_json::Value;

use crate::binding::{expect_shape, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle, VERSION_REGISTER};

/// Render a version register as `major.minor` in hex (`0x0234` is `2.34`).
pub fn format_version(vstr: u32) -> String {
    format!("{:x}.{:02x}", (vstr >> 8) & 0xff, vstr & 0xff)
}

/// Firmware version read from `VSTR`.
#[derive(Debug, Clone, Default)]
pub struct FirmwareBinding {
    version: String,
    state: BindingState,
}

impl FirmwareBinding {
    /// Empty display until a port is open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Version as displayed, empty while no port is open.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl AttributeBinding for FirmwareBinding {
    fn key(&self) -> &str {
        keys::FIRMWARE
    }

    fn label(&self) -> &str {
        "Firmware"
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        self.version.clone()
    }

    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        let key = keys::register(VERSION_REGISTER);
        let value = session.read_attribute(&key)?;
        let vstr = expect_shape(&key, value, AttributeValue::as_u32)?;
        self.version = format_version(vstr);
        Ok(())
    }

    fn clear(&mut self) {
        self.version.clear();
    }

    fn push(&mut self, _session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        Ok(())
    }

    /// The version always comes from the card, so it is never saved.
    fn export_value(&self) -> Option<Value> {
        None
    }

    fn import_value(&mut self, _fragment: &Value) {}
}
