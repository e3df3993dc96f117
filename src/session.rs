//! Port session: the single owner of the open device handle.
//!
//! `PortSession` holds zero or one open [`DeviceHandle`]. Selecting a port
//! always closes the previous handle before the driver is asked to open the
//! next one, so at most one handle exists at any time. Every transition is
//! published to subscribers as a [`SessionChangeEvent`].
//!
//! The handle never leaves the session. Callers borrow it through
//! [`PortSession::handle_mut`] for the duration of a single call.

use tracing::{info, info_span, warn};

use crate::error::OpenError;
use crate::hardware::device::{DeviceHandle, PortDriver, PortId};

/// One session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChangeEvent {
    /// Increments on every transition, starting at 1.
    pub generation: u64,
    /// Port now open, or `None` when no device is active.
    pub port: Option<PortId>,
    /// Why the requested port could not be opened.
    pub failure: Option<OpenError>,
}

impl SessionChangeEvent {
    /// Whether the event carries an open port.
    pub fn is_active(&self) -> bool {
        self.port.is_some()
    }
}

/// Callback invoked with every published event.
pub type SessionListener = Box<dyn FnMut(&SessionChangeEvent)>;

/// Owner of the single open port handle.
pub struct PortSession<D: PortDriver> {
    driver: D,
    handle: Option<Box<dyn DeviceHandle>>,
    generation: u64,
    listeners: Vec<SessionListener>,
}

impl<D: PortDriver> PortSession<D> {
    /// Session with no port open.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            handle: None,
            generation: 0,
            listeners: Vec::new(),
        }
    }

    /// Driver the session opens ports through.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Ports the driver currently lists.
    pub fn available_ports(&self) -> Vec<String> {
        self.driver.available_ports()
    }

    /// Whether a port is open.
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Port of the open handle.
    pub fn current_port(&self) -> Option<&PortId> {
        self.handle.as_ref().map(|handle| handle.port())
    }

    /// Increments on every transition.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Borrow the open handle for one call.
    pub fn handle_mut(&mut self) -> Option<&mut dyn DeviceHandle> {
        match self.handle.as_mut() {
            Some(handle) => Some(&mut **handle),
            None => None,
        }
    }

    /// Register a callback for every future transition.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionChangeEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Close the current port, then open `name`.
    ///
    /// On failure no port is active and the event carries the classified
    /// [`OpenError`].
    pub fn select(&mut self, name: &str) -> SessionChangeEvent {
        let _span = info_span!("select_port", port = name).entered();
        self.close_current();

        let opened = PortId::parse(name)
            .and_then(|port| self.driver.open(&port).map(|handle| (port, handle)));

        let event = match opened {
            Ok((port, handle)) => {
                info!(port = %port, "Port opened");
                self.handle = Some(handle);
                self.next_event(Some(port), None)
            }
            Err(err) => {
                warn!(port = name, error = %err, "Failed to open port");
                self.next_event(None, Some(err))
            }
        };

        self.publish(&event);
        event
    }

    /// Close the current port, if any, and publish the inactive state.
    pub fn deselect(&mut self) -> SessionChangeEvent {
        self.close_current();
        let event = self.next_event(None, None);
        info!(generation = event.generation, "Session cleared");
        self.publish(&event);
        event
    }

    fn close_current(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let port = handle.port().clone();
            match handle.close() {
                Ok(()) => info!(port = %port, "Port closed"),
                Err(err) => warn!(port = %port, error = %err, "Failed to close port cleanly"),
            }
        }
    }

    fn next_event(&mut self, port: Option<PortId>, failure: Option<OpenError>) -> SessionChangeEvent {
        self.generation += 1;
        SessionChangeEvent {
            generation: self.generation,
            port,
            failure,
        }
    }

    fn publish(&mut self, event: &SessionChangeEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl<D: PortDriver> Drop for PortSession<D> {
    fn drop(&mut self) {
        self.close_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockPort, MockPortDriver};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    fn driver() -> MockPortDriver {
        MockPortDriver::new()
            .with_port(MockPort::current("FSCC0"))
            .with_port(MockPort::legacy("FSCC1"))
            .with_port(MockPort::current("FSCC2").with_access_denied())
    }

    #[test]
    fn select_closes_previous_handle_first() {
        let mut session = PortSession::new(driver());

        let first = session.select("FSCC0");
        assert!(first.is_active());
        let second = session.select("FSCC1");
        assert_eq!(second.port.as_ref().map(PortId::name), Some("FSCC1"));

        assert_eq!(session.driver().peak_open_handles(), 1);
        assert!(!session.driver().port("FSCC0").unwrap().is_open());
        assert_eq!(second.generation, 2);
    }

    #[test]
    fn reselecting_the_same_port_reopens_it() {
        let mut session = PortSession::new(driver());
        session.select("FSCC0");
        let again = session.select("FSCC0");

        assert!(again.is_active());
        assert_eq!(session.driver().port("FSCC0").unwrap().open_count(), 2);
    }

    #[test]
    fn open_failures_are_classified() {
        let mut session = PortSession::new(driver());

        let missing = session.select("FSCC7");
        assert!(matches!(missing.failure, Some(OpenError::NotFound { .. })));
        assert!(!session.is_active());

        let denied = session.select("FSCC2");
        assert!(matches!(denied.failure, Some(OpenError::AccessDenied { .. })));
        assert!(session.handle_mut().is_none());
    }

    #[test]
    fn failed_select_still_closes_previous() {
        let mut session = PortSession::new(driver());
        session.select("FSCC0");
        session.select("FSCC7");

        assert!(!session.driver().port("FSCC0").unwrap().is_open());
        assert_eq!(session.driver().open_handles(), 0);
    }

    #[test]
    fn listeners_see_every_transition() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut session = PortSession::new(driver());
        let sink = Rc::clone(&seen);
        session.subscribe(move |event| sink.borrow_mut().push(event.is_active()));

        session.select("FSCC0");
        session.deselect();
        session.select("FSCC7");

        assert_eq!(*seen.borrow(), vec![true, false, false]);
    }

    #[test]
    fn drop_closes_the_handle() {
        let port = MockPort::current("FSCC0");
        let driver = MockPortDriver::new().with_port(port.clone());
        {
            let mut session = PortSession::new(driver);
            session.select("FSCC0");
            assert!(port.is_open());
        }
        assert!(!port.is_open());
    }

    #[test]
    #[traced_test]
    fn open_failure_is_logged() {
        let mut session = PortSession::new(driver());
        session.select("FSCC2");
        assert!(logs_contain("Failed to open port"));
    }
}
