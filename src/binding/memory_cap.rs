//! Input/output memory caps, in bytes.

use serde_json::{Map, Value};

use crate::binding::{expect_shape, write_error, AttributeBinding, BindingState};
use crate::error::{AttributeError, BindingApplyError, ValidationError};
use crate::hardware::device::{keys, AttributeValue, DeviceHandle};
use crate::validation::parse_byte_count;

const EXPECTED: &str = "a non-negative number of bytes";

/// Input and output memory caps, edited as text.
#[derive(Debug, Clone, Default)]
pub struct MemoryCapBinding {
    input: String,
    output: String,
    state: BindingState,
}

impl MemoryCapBinding {
    /// Both caps empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input cap edit text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Output cap edit text.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Replace the input cap text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Replace the output cap text.
    pub fn set_output(&mut self, text: impl Into<String>) {
        self.output = text.into();
    }

    fn validate(&self) -> Result<(u64, u64), Vec<ValidationError>> {
        let input = parse_byte_count(keys::MEMORY_CAP_INPUT, &self.input);
        let output = parse_byte_count(keys::MEMORY_CAP_OUTPUT, &self.output);
        match (input, output) {
            (Ok(input), Ok(output)) => Ok((input, output)),
            (input, output) => Err([input.err(), output.err()].into_iter().flatten().collect()),
        }
    }
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn field_value(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(n) if n.to_string() == text => Value::from(n),
        _ => Value::String(text.to_string()),
    }
}

impl AttributeBinding for MemoryCapBinding {
    fn key(&self) -> &str {
        keys::MEMORY_CAP
    }

    fn label(&self) -> &str {
        "Memory Cap (Bytes)"
    }

    fn state(&self) -> &BindingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BindingState {
        &mut self.state
    }

    fn display_value(&self) -> String {
        format!("input={} output={}", self.input, self.output)
    }

    fn pull(&mut self, session: &mut dyn DeviceHandle) -> Result<(), AttributeError> {
        let input = session.read_attribute(keys::MEMORY_CAP_INPUT)?;
        let input = expect_shape(keys::MEMORY_CAP_INPUT, input, AttributeValue::as_integer)?;
        let output = session.read_attribute(keys::MEMORY_CAP_OUTPUT)?;
        let output = expect_shape(keys::MEMORY_CAP_OUTPUT, output, AttributeValue::as_integer)?;
        self.input = input.to_string();
        self.output = output.to_string();
        Ok(())
    }

    fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }

    /// Both fields are validated before either is written.
    fn push(&mut self, session: &mut dyn DeviceHandle) -> Result<(), BindingApplyError> {
        let (input, output) = self.validate().map_err(BindingApplyError::Invalid)?;

        session
            .write_attribute(keys::MEMORY_CAP_INPUT, AttributeValue::from(input))
            .map_err(|err| write_error(keys::MEMORY_CAP_INPUT, &self.input, EXPECTED, err))?;
        session
            .write_attribute(keys::MEMORY_CAP_OUTPUT, AttributeValue::from(output))
            .map_err(|err| write_error(keys::MEMORY_CAP_OUTPUT, &self.output, EXPECTED, err))
    }

    fn export_value(&self) -> Option<Value> {
        let mut map = Map::new();
        map.insert("input".to_string(), field_value(&self.input));
        map.insert("output".to_string(), field_value(&self.output));
        Some(Value::Object(map))
    }

    fn import_value(&mut self, fragment: &Value) {
        if let Some(text) = fragment.get("input").and_then(field_text) {
            self.input = text;
        }
        if let Some(text) = fragment.get("output").and_then(field_text) {
            self.output = text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_reports_each_bad_field() {
        let mut cap = MemoryCapBinding::new();
        cap.set_input("-1");
        cap.set_output("lots");
        let errors = cap.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(fields, [keys::MEMORY_CAP_INPUT, keys::MEMORY_CAP_OUTPUT]);
    }

    #[test]
    fn zero_is_a_valid_cap() {
        let mut cap = MemoryCapBinding::new();
        cap.set_input("0");
        cap.set_output("0");
        assert_eq!(cap.validate(), Ok((0, 0)));
    }

    #[test]
    fn partial_import_keeps_missing_field() {
        let mut cap = MemoryCapBinding::new();
        cap.set_input("100");
        cap.set_output("200");

        cap.import_value(&json!({ "input": 4096 }));
        assert_eq!(cap.input(), "4096");
        assert_eq!(cap.output(), "200");

        cap.import_value(&json!({ "input": [1], "output": "300" }));
        assert_eq!(cap.input(), "4096");
        assert_eq!(cap.output(), "300");
    }

    #[test]
    fn export_round_trips() {
        let mut cap = MemoryCapBinding::new();
        cap.set_input("1000000");
        cap.set_output("-5");

        let mut copy = MemoryCapBinding::new();
        copy.import_value(&cap.export_value().unwrap());
        assert_eq!(copy.input(), "1000000");
        assert_eq!(copy.output(), "-5");
    }
}
