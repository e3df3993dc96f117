//! Stateless port commands: purge and the transmit timer strobes.

use serde_json::Value;
use tracing::info;

use crate::binding::{AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError};
use crate::hardware::device::{
    keys, AttributeValue, Command, DeviceHandle, CMDR_STIMR, CMDR_TIMR, COMMAND_REGISTER,
};

/// Buttons that act on the port immediately.
///
/// Enabled whenever a session is present. Contributes nothing to settings
/// documents.
#[derive(Debug, Clone, Default)]
pub struct CommandBinding {
    state: BindingState,
}

impl CommandBinding {
    /// Command binding for the open port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a command against the session.
    pub fn execute(
        &self,
        session: &mut dyn DeviceHandle,
        command: Command,
    ) -> Result<(), AttributeError> {
        info!(port = %session.port(), command = command.label(), "Executing command");
        let strobe = match command {
            Command::Purge => return session.purge(),
            Command::StartTimer => CMDR_TIMR,
            Command::StopTimer => CMDR_STIMR,
        };
        session.write_attribute(&keys::register(COMMAND_REGISTER), AttributeValue::from(strobe))
    }
}

impl AttributeBinding for CommandBinding {
    fn key(&self) -> &str {
        keys::COMMANDS
    }

    fn label(&self) -> &str {
        "Commands"
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        String::new()
    }

    fn pull(&mut self, _session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        Ok(())
    }

    fn clear(&mut self) {}

    fn push(&mut self, _session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        Ok(())
    }

    fn export_value(&self) -> Option<Value> {
        None
    }

    fn import_value(&mut self, _fragment: &Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockPortDriver;
    use crate::hardware::{PortDriver, PortId};

    #[test]
    fn timer_commands_strobe_cmdr() {
        let driver = MockPortDriver::demo();
        let mut handle = driver.open(&PortId::parse("FSCC0").unwrap()).unwrap();
        let commands = CommandBinding::new();

        commands.execute(handle.as_mut(), Command::StartTimer).unwrap();
        commands.execute(handle.as_mut(), Command::StopTimer).unwrap();
        commands.execute(handle.as_mut(), Command::Purge).unwrap();

        let port = driver.port("FSCC0").unwrap();
        assert_eq!(
            port.writes_to("registers.CMDR"),
            vec![AttributeValue::from(CMDR_TIMR), AttributeValue::from(CMDR_STIMR)]
        );
        assert_eq!(port.purge_count(), 1);
    }

    #[test]
    fn commands_are_enabled_with_any_session() {
        let driver = MockPortDriver::demo();
        let mut handle = driver.open(&PortId::parse("FSCC2").unwrap()).unwrap();
        let mut commands = CommandBinding::new();

        commands.on_session_changed(Some(handle.as_mut())).unwrap();
        assert!(commands.state().is_enabled());
        assert_eq!(commands.export_value(), None);
    }
}
