//! Integration tests for apply: validation ranges, gating and error collection

use fscc_settings::binding::{
    ClockFrequencyBinding, FlagBinding, MemoryCapBinding, RegisterBinding, TransmitTrigger,
    TxModifiersBinding,
};
use fscc_settings::error::ApplyError;
use fscc_settings::hardware::device::{keys, AttributeValue, Command, CMDR_TIMR, TXT};
use fscc_settings::hardware::mock::{MockPort, MockPortDriver};
use fscc_settings::panel::ControlPanel;

fn panel() -> ControlPanel<MockPortDriver> {
    let mut panel = ControlPanel::standard(MockPortDriver::new().with_port(MockPort::current("FSCC0")));
    panel.select("FSCC0");
    panel
}

fn set_clock(panel: &mut ControlPanel<MockPortDriver>, text: &str) {
    panel
        .binding_mut::<ClockFrequencyBinding>(keys::CLOCK_FREQUENCY)
        .unwrap()
        .set_text(text);
}

fn clock_writes(panel: &ControlPanel<MockPortDriver>) -> Vec<AttributeValue> {
    panel
        .session()
        .driver()
        .port("FSCC0")
        .unwrap()
        .writes_to(keys::CLOCK_FREQUENCY)
}

// =============================================================================
// Clock Frequency
// =============================================================================

#[test]
fn clock_frequency_bounds_are_inclusive() {
    let mut panel = panel();

    for hz in ["15000", "270000000"] {
        set_clock(&mut panel, hz);
        panel.apply().unwrap();
    }
    assert_eq!(
        clock_writes(&panel),
        vec![AttributeValue::Integer(15_000), AttributeValue::Integer(270_000_000)]
    );

    for hz in ["14999", "270000001"] {
        set_clock(&mut panel, hz);
        let err = panel.apply().unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
        assert_eq!(err.validation_errors()[0].key, keys::CLOCK_FREQUENCY);
        assert!(err.to_string().contains("270,000,000"));
    }
    assert_eq!(clock_writes(&panel).len(), 2);
}

#[test]
fn empty_clock_field_is_not_written() {
    let mut panel = panel();
    panel.apply().unwrap();
    assert!(clock_writes(&panel).is_empty());
}

// =============================================================================
// Memory Cap
// =============================================================================

#[test]
fn negative_memory_cap_is_rejected_before_any_write() {
    let mut panel = panel();
    let cap = panel.binding_mut::<MemoryCapBinding>(keys::MEMORY_CAP).unwrap();
    cap.set_input("-1");
    cap.set_output("2048");

    let err = panel.apply().unwrap_err();

    assert_eq!(err.validation_errors()[0].key, keys::MEMORY_CAP_INPUT);
    let port = panel.session().driver().port("FSCC0").unwrap();
    assert!(port.writes_to(keys::MEMORY_CAP_INPUT).is_empty());
    assert!(port.writes_to(keys::MEMORY_CAP_OUTPUT).is_empty());
}

#[test]
fn zero_memory_cap_is_accepted() {
    let mut panel = panel();
    let cap = panel.binding_mut::<MemoryCapBinding>(keys::MEMORY_CAP).unwrap();
    cap.set_input("0");
    cap.set_output("0");

    panel.apply().unwrap();

    let port = panel.session().driver().port("FSCC0").unwrap();
    assert_eq!(port.attribute(keys::MEMORY_CAP_INPUT), Some(AttributeValue::Integer(0)));
    assert_eq!(port.attribute(keys::MEMORY_CAP_OUTPUT), Some(AttributeValue::Integer(0)));
}

// =============================================================================
// Error Collection
// =============================================================================

#[test]
fn every_invalid_field_is_reported_and_none_pushed() {
    let mut panel = panel();
    set_clock(&mut panel, "10");
    panel
        .binding_mut::<MemoryCapBinding>(keys::MEMORY_CAP)
        .unwrap()
        .set_input("-5");

    let err = panel.apply().unwrap_err();

    let ApplyError::Rejected { errors, applied } = &err else {
        panic!("expected validation failure, got {err:?}");
    };
    let mut fields: Vec<_> = errors.iter().map(|e| e.key.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, [keys::CLOCK_FREQUENCY, keys::MEMORY_CAP_INPUT]);
    assert!(!applied.iter().any(|k| k == keys::MEMORY_CAP || k == keys::CLOCK_FREQUENCY));

    let port = panel.session().driver().port("FSCC0").unwrap();
    assert!(port.writes_to(keys::CLOCK_FREQUENCY).is_empty());
    assert!(port.writes_to(keys::MEMORY_CAP_INPUT).is_empty());
}

#[test]
fn valid_bindings_apply_alongside_rejected_ones() {
    let mut panel = panel();
    panel
        .binding_mut::<FlagBinding>(keys::IGNORE_TIMEOUT)
        .unwrap()
        .set_checked(true);
    panel
        .binding_mut::<RegisterBinding>("registers.CCR1")
        .unwrap()
        .set_text("not hex");

    let err = panel.apply().unwrap_err();

    assert_eq!(err.validation_errors()[0].key, "registers.CCR1");
    assert!(err.applied().iter().any(|k| k == keys::IGNORE_TIMEOUT));
    let port = panel.session().driver().port("FSCC0").unwrap();
    assert_eq!(port.attribute(keys::IGNORE_TIMEOUT), Some(AttributeValue::Bool(true)));
}

#[test]
fn device_fault_during_apply_is_surfaced() {
    let port = MockPort::current("FSCC0");
    let mut panel = ControlPanel::standard(MockPortDriver::new().with_port(port.clone()));
    panel.select("FSCC0");
    panel
        .binding_mut::<TxModifiersBinding>(keys::TX_MODIFIERS)
        .unwrap()
        .set_trigger(TransmitTrigger::OnTimer)
        .unwrap();
    // Fails only after the pull succeeded.
    port.set_failing(keys::IGNORE_TIMEOUT);

    let err = panel.apply().unwrap_err();

    let ApplyError::Device { faults, applied, .. } = &err else {
        panic!("expected device failure, got {err:?}");
    };
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].key, keys::IGNORE_TIMEOUT);
    assert!(applied.iter().any(|k| k == keys::TX_MODIFIERS));
    assert_eq!(port.attribute(keys::TX_MODIFIERS), Some(AttributeValue::from(TXT)));
}

// =============================================================================
// Gating and Commands
// =============================================================================

#[test]
fn apply_is_gated_on_an_active_session() {
    let mut panel = ControlPanel::standard(MockPortDriver::demo());
    assert!(matches!(panel.apply(), Err(ApplyError::NotPermitted)));

    panel.select("FSCC0");
    assert!(panel.apply().is_ok());

    panel.deselect();
    assert!(matches!(panel.apply(), Err(ApplyError::NotPermitted)));
}

#[test]
fn start_timer_strobes_the_command_register() {
    let mut panel = panel();
    panel.execute(Command::StartTimer).unwrap();
    assert_eq!(
        panel
            .session()
            .driver()
            .port("FSCC0")
            .unwrap()
            .writes_to("registers.CMDR"),
        vec![AttributeValue::from(CMDR_TIMR)]
    );
}
