//! Integration tests for session-change dispatch across every binding kind
//!
//! Exercises the standard panel against simulated ports of both device
//! kinds.

use fscc_settings::binding::{
    AttributeBinding, ClockFrequencyBinding, FirmwareBinding, FlagBinding, MemoryCapBinding,
    RegisterBinding, TransmitTrigger, TxModifiersBinding, UNSUPPORTED_REASON,
};
use fscc_settings::error::OpenError;
use fscc_settings::hardware::device::{keys, TXT, XREP};
use fscc_settings::hardware::mock::{MockPort, MockPortDriver};
use fscc_settings::panel::{standard_registry, ControlPanel};

fn driver() -> MockPortDriver {
    MockPortDriver::new()
        .with_port(
            MockPort::current("FSCC0")
                .with_attribute(keys::APPEND_TIMESTAMP, true)
                .with_attribute("registers.CCR0", 0x0000_1234_u32)
                .with_attribute(keys::MEMORY_CAP_INPUT, 4096_i64)
                .with_attribute(keys::TX_MODIFIERS, XREP | TXT),
        )
        .with_port(
            MockPort::legacy("FSCC1")
                .with_attribute("registers.CCR0", 0x0000_5678_u32)
                .with_failing("registers.CCR1"),
        )
        .with_port(MockPort::current("FSCC2").with_access_denied())
}

// =============================================================================
// Capability Detection
// =============================================================================

#[test]
fn unsupported_attributes_disable_without_failing_dispatch() {
    let mut panel = ControlPanel::standard(
        MockPortDriver::new().with_port(MockPort::legacy("FSCC0")),
    );

    let reports = panel.select("FSCC0");
    let report = reports[0].dispatch.as_ref().unwrap();

    for key in [keys::APPEND_TIMESTAMP, keys::RX_MULTIPLE, keys::MEMORY_CAP] {
        assert!(report.unsupported.iter().any(|k| k == key), "{key}");
        let binding = panel.registry().get(key).unwrap();
        assert!(!binding.state().is_enabled());
        assert_eq!(binding.state().unsupported_reason(), Some(UNSUPPORTED_REASON));
    }
    assert!(panel.registry().get(keys::APPEND_STATUS).unwrap().state().is_enabled());
    assert!(panel.is_apply_permitted());
}

#[test]
fn current_kind_supports_everything() {
    let mut panel = ControlPanel::standard(driver());
    let reports = panel.select("FSCC0");
    let report = reports[0].dispatch.as_ref().unwrap();

    assert!(report.unsupported.is_empty());
    assert_eq!(report.supported.len(), panel.registry().len());
    assert_eq!(
        panel
            .binding::<FirmwareBinding>(keys::FIRMWARE)
            .unwrap()
            .version(),
        "2.34"
    );
    let tx = panel.binding::<TxModifiersBinding>(keys::TX_MODIFIERS).unwrap();
    assert!(tx.repeat());
    assert_eq!(tx.trigger(), TransmitTrigger::OnTimer);
}

#[test]
fn device_failure_is_not_treated_as_unsupported() {
    let mut panel = ControlPanel::standard(driver());
    let reports = panel.select("FSCC1");

    let err = reports[0].dispatch.as_ref().unwrap_err();
    assert_eq!(err.faults.len(), 1);
    assert_eq!(err.faults[0].key, "registers.CCR1");

    let ccr1 = panel.registry().get("registers.CCR1").unwrap();
    assert!(!ccr1.state().is_enabled());
    assert_eq!(ccr1.state().unsupported_reason(), None);
    assert!(ccr1.state().failure().is_some());

    // Every other binding was still visited.
    assert!(panel.registry().get("registers.CCR2").unwrap().state().is_enabled());
}

// =============================================================================
// Session Switching
// =============================================================================

#[test]
fn switching_ports_does_not_leak_values() {
    let mut panel = ControlPanel::standard(driver());
    panel.select("FSCC0");
    assert!(panel
        .binding::<FlagBinding>(keys::APPEND_TIMESTAMP)
        .unwrap()
        .is_checked());

    panel.select("FSCC1");

    assert!(!panel
        .binding::<FlagBinding>(keys::APPEND_TIMESTAMP)
        .unwrap()
        .is_checked());
    let cap = panel.binding::<MemoryCapBinding>(keys::MEMORY_CAP).unwrap();
    assert_eq!((cap.input(), cap.output()), ("", ""));
    assert_eq!(
        panel
            .binding::<RegisterBinding>("registers.CCR0")
            .unwrap()
            .text(),
        "00005678"
    );
    // Failed pull shows the cleared value, not FSCC0's.
    assert_eq!(
        panel
            .binding::<RegisterBinding>("registers.CCR1")
            .unwrap()
            .text(),
        "00000000"
    );
    assert_eq!(panel.session().driver().peak_open_handles(), 1);
}

#[test]
fn deselect_disables_and_clears_everything() {
    let mut panel = ControlPanel::standard(driver());
    panel.select("FSCC0");

    panel.deselect();

    assert!(!panel.is_apply_permitted());
    assert!(panel
        .registry()
        .iter()
        .all(|binding| !binding.state().is_enabled()));
    assert_eq!(
        panel
            .binding::<RegisterBinding>("registers.CCR0")
            .unwrap()
            .text(),
        "00000000"
    );
    assert_eq!(panel.session().driver().open_handles(), 0);
}

#[test]
fn not_found_and_access_denied_are_distinguished() {
    let mut panel = ControlPanel::standard(driver());

    let missing = panel.select("FSCC5");
    let denied = panel.select("FSCC2");

    let missing = missing[0].open_failure().unwrap();
    let denied = denied[0].open_failure().unwrap();
    assert!(matches!(missing, OpenError::NotFound { .. }));
    assert!(matches!(denied, OpenError::AccessDenied { .. }));
    assert_ne!(missing.guidance(), denied.guidance());
}

// =============================================================================
// Round Trip
// =============================================================================

fn round_trip<B: AttributeBinding>(original: &B, mut copy: B) -> B {
    let value = original.export_value().unwrap();
    copy.import_value(&value);
    copy
}

#[test]
fn export_import_reproduces_every_kind() {
    let mut flag = FlagBinding::append_status();
    flag.set_checked(true);
    assert!(round_trip(&flag, FlagBinding::append_status()).is_checked());

    let mut register = RegisterBinding::new("CCR0");
    register.set_value(0xdead_beef);
    assert_eq!(round_trip(&register, RegisterBinding::new("CCR0")).text(), "deadbeef");

    let mut clock = ClockFrequencyBinding::new();
    clock.set_text("18432000");
    assert_eq!(round_trip(&clock, ClockFrequencyBinding::new()).text(), "18432000");

    let mut cap = MemoryCapBinding::new();
    cap.set_input("0");
    cap.set_output("65536");
    let copy = round_trip(&cap, MemoryCapBinding::new());
    assert_eq!((copy.input(), copy.output()), ("0", "65536"));

    let mut tx = TxModifiersBinding::new();
    tx.set_trigger(TransmitTrigger::OnExternalSignal).unwrap();
    let copy = round_trip(&tx, TxModifiersBinding::new());
    assert_eq!(copy.trigger(), TransmitTrigger::OnExternalSignal);
    assert!(!copy.repeat());
}

#[test]
fn imported_document_does_not_override_firmware() {
    let mut panel = ControlPanel::standard(driver());
    panel.select("FSCC0");

    panel.import_document(&serde_json::json!({"firmware": "9.99"}));

    let firmware = panel.binding::<FirmwareBinding>(keys::FIRMWARE).unwrap();
    assert_eq!(firmware.version(), "2.34");
    assert!(panel.export_document().get(keys::FIRMWARE).is_none());
}

#[test]
fn whole_panel_round_trips_through_a_document() {
    let mut live = ControlPanel::standard(driver());
    live.select("FSCC0");
    let document = live.export_document();

    let mut offline = ControlPanel::new(MockPortDriver::new(), standard_registry());
    offline.import_document(&document);

    assert_eq!(offline.export_document(), document);
}
