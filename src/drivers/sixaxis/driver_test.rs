use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::{
    drivers::sixaxis::{
        driver::{Driver, DriverOptions, StopHandle, REPORT_SIZE, TRANSFER_TIMEOUT},
        error::{ConnectError, DecodeError, PollError, RunError},
        state::{Button, ButtonSet},
    },
    transport::{ControlRequest, Transport, TransportError, ERROR_PIPE, ERROR_TIMEOUT},
};

/// Calls recorded by the [MockTransport]
#[derive(Debug, Default)]
struct Calls {
    inits: usize,
    exits: usize,
    opened: usize,
    closed: usize,
    claimed: Vec<u8>,
    released: Vec<u8>,
    polls: usize,
    requests: Vec<(ControlRequest, Duration)>,
    auto_detach: Option<bool>,
    /// Order of the connect steps, e.g. ["auto_detach", "claim 0"]
    steps: Vec<String>,
}

struct MockTransport {
    init_fails: bool,
    open_fails: bool,
    device: Option<(u16, u16)>,
    interfaces: Vec<u8>,
    failing_claims: Vec<u8>,
    interfaces_fail: bool,
    release_fails: bool,
    /// Extra bytes added to the length reported by each transfer
    over_report: usize,
    responses: VecDeque<Result<Vec<u8>, i32>>,
    calls: Rc<RefCell<Calls>>,
}

impl MockTransport {
    fn new(calls: Rc<RefCell<Calls>>) -> Self {
        let options = DriverOptions::default();
        Self {
            init_fails: false,
            open_fails: false,
            device: Some((options.vendor_id, options.product_id)),
            interfaces: vec![0],
            failing_claims: vec![],
            interfaces_fail: false,
            release_fails: false,
            over_report: 0,
            responses: VecDeque::new(),
            calls,
        }
    }

    fn respond(mut self, responses: Vec<Result<Vec<u8>, i32>>) -> Self {
        self.responses = responses.into();
        self
    }
}

impl Transport for MockTransport {
    type Handle = u8;

    fn init(&mut self, _debug: bool) -> Result<(), TransportError> {
        self.calls.borrow_mut().inits += 1;
        if self.init_fails {
            return Err(TransportError::Other("no usb".into()));
        }
        Ok(())
    }

    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError> {
        if self.open_fails {
            return Err(TransportError::Other("access denied".into()));
        }
        if self.device != Some((vendor_id, product_id)) {
            return Ok(None);
        }
        self.calls.borrow_mut().opened += 1;
        Ok(Some(1))
    }

    fn set_auto_detach_kernel_driver(
        &mut self,
        _handle: &mut Self::Handle,
        enable: bool,
    ) -> Result<(), TransportError> {
        let mut calls = self.calls.borrow_mut();
        calls.auto_detach = Some(enable);
        calls.steps.push("auto_detach".to_string());
        Ok(())
    }

    fn interfaces(&mut self, _handle: &Self::Handle) -> Result<Vec<u8>, TransportError> {
        if self.interfaces_fail {
            return Err(TransportError::Other("no configuration".into()));
        }
        Ok(self.interfaces.clone())
    }

    fn claim_interface(
        &mut self,
        _handle: &mut Self::Handle,
        iface: u8,
    ) -> Result<(), TransportError> {
        self.calls.borrow_mut().steps.push(format!("claim {iface}"));
        if self.failing_claims.contains(&iface) {
            return Err(TransportError::Other("busy".into()));
        }
        self.calls.borrow_mut().claimed.push(iface);
        Ok(())
    }

    fn release_interface(
        &mut self,
        _handle: &mut Self::Handle,
        iface: u8,
    ) -> Result<(), TransportError> {
        if self.release_fails {
            return Err(TransportError::NotClaimed(iface));
        }
        self.calls.borrow_mut().released.push(iface);
        Ok(())
    }

    fn control_transfer(
        &mut self,
        _handle: &mut Self::Handle,
        request: &ControlRequest,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, i32> {
        let mut calls = self.calls.borrow_mut();
        calls.polls += 1;
        calls.requests.push((*request, timeout));
        let data = self.responses.pop_front().unwrap_or(Err(ERROR_TIMEOUT))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len() + self.over_report)
    }

    fn close(&mut self, _handle: Self::Handle) {
        self.calls.borrow_mut().closed += 1;
    }

    fn exit(&mut self) {
        self.calls.borrow_mut().exits += 1;
    }
}

/// Raw report with centered sticks and the given button group codes
fn report(system: u8, action: u8, ps: u8) -> Vec<u8> {
    let mut buf = vec![0; REPORT_SIZE];
    buf[0] = 0x01;
    buf[2] = system;
    buf[3] = action;
    buf[4] = ps;
    buf[6..=9].copy_from_slice(&[128, 128, 128, 128]);
    buf
}

fn connect(transport: MockTransport) -> Result<Driver<MockTransport>, ConnectError> {
    Driver::connect(transport, &DriverOptions::default())
}

#[test]
fn test_connect_device_not_found() {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone());
    transport.device = Some((0x1234, 0x5678));

    let result = connect(transport);
    assert!(matches!(
        result,
        Err(ConnectError::DeviceNotFound {
            vendor_id: 0x054C,
            product_id: 0x0268
        })
    ));

    let calls = calls.borrow();
    assert!(calls.claimed.is_empty());
    assert_eq!(calls.opened, 0);
    assert_eq!(calls.exits, 1);
}

#[test]
fn test_connect_transport_init_failure() {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone());
    transport.init_fails = true;

    let result = connect(transport);
    assert!(matches!(result, Err(ConnectError::TransportInit(_))));
    assert_eq!(calls.borrow().opened, 0);
}

#[test]
fn test_connect_open_failure() {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone());
    transport.open_fails = true;

    let result = connect(transport);
    assert!(matches!(result, Err(ConnectError::OpenFailed(_))));
    assert!(calls.borrow().claimed.is_empty());
    assert_eq!(calls.borrow().exits, 1);
}

#[test]
fn test_connect_tolerates_claim_failures() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone());
    transport.interfaces = vec![0, 1, 2];
    transport.failing_claims = vec![1];

    let mut driver = connect(transport)?;
    assert!(driver.is_connected());
    assert_eq!(driver.claimed_interfaces(), &[0, 2]);
    assert_eq!(calls.borrow().auto_detach, Some(true));
    assert_eq!(
        calls.borrow().steps,
        vec!["auto_detach", "claim 0", "claim 1", "claim 2"]
    );

    driver.disconnect();
    driver.disconnect();
    assert!(!driver.is_connected());

    let calls = calls.borrow();
    assert_eq!(calls.released, vec![0, 2]);
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.exits, 1);

    Ok(())
}

#[test]
fn test_connect_interfaces_failure() {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone());
    transport.interfaces_fail = true;

    let result = connect(transport);
    assert!(matches!(result, Err(ConnectError::OpenFailed(_))));
    let calls = calls.borrow();
    assert!(calls.claimed.is_empty());
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.exits, 1);
}

#[test]
fn test_poll_once_request() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![Ok(report(0x10, 0, 0))]);

    let mut driver = connect(transport)?;
    let state = driver.poll_once()?;
    assert!(state.is_pressed(Button::DPadUp));

    let calls = calls.borrow();
    let (request, timeout) = calls.requests[0];
    assert_eq!(request.request_type_byte(), 0xA1);
    assert_eq!(request.request, 0x01);
    assert_eq!(request.value, 0x0101);
    assert_eq!(request.index, 0);
    assert_eq!(timeout, TRANSFER_TIMEOUT);

    Ok(())
}

#[test]
fn test_poll_once_errors() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![
        Err(ERROR_TIMEOUT),
        Err(ERROR_PIPE),
        Ok(vec![0x01; 10]),
    ]);

    let mut driver = connect(transport)?;
    assert!(matches!(
        driver.poll_once(),
        Err(RunError::Poll(PollError::Timeout))
    ));
    assert!(matches!(
        driver.poll_once(),
        Err(RunError::Poll(PollError::TransferError(ERROR_PIPE)))
    ));
    assert!(matches!(
        driver.poll_once(),
        Err(RunError::Decode(DecodeError::MalformedReport {
            expected: REPORT_SIZE,
            actual: 10
        }))
    ));

    Ok(())
}

#[test]
fn test_stop_from_observer() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let responses = (0..10).map(|_| Ok(report(0, 0, 0))).collect();
    let transport = MockTransport::new(calls.clone()).respond(responses);

    let driver = connect(transport)?;
    let mut iterations = 0;
    driver.run(|_update, stop| {
        iterations += 1;
        if iterations == 3 {
            stop.stop();
            // Teardown must not happen while the observer is running
            assert_eq!(calls.borrow().closed, 0);
        }
    })?;

    assert_eq!(iterations, 3);
    let calls = calls.borrow();
    assert_eq!(calls.polls, 3);
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.released, vec![0]);
    assert_eq!(calls.exits, 1);

    Ok(())
}

#[test]
fn test_poll_error_ends_run() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![
        Ok(report(0, 0, 0)),
        Err(ERROR_PIPE),
        Ok(report(0, 0, 0)),
    ]);

    let driver = connect(transport)?;
    let mut iterations = 0;
    let result = driver.run(|_, _| iterations += 1);

    assert!(matches!(
        result,
        Err(RunError::Poll(PollError::TransferError(ERROR_PIPE)))
    ));
    assert_eq!(iterations, 1);
    let calls = calls.borrow();
    assert_eq!(calls.polls, 2);
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.exits, 1);

    Ok(())
}

#[test]
fn test_release_failure_keeps_poll_error() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone()).respond(vec![Err(ERROR_PIPE)]);
    transport.interfaces = vec![0, 1];
    transport.release_fails = true;

    let driver = connect(transport)?;
    let result = driver.run(|_, _| panic!("observer should not be called"));

    assert!(matches!(
        result,
        Err(RunError::Poll(PollError::TransferError(ERROR_PIPE)))
    ));
    let calls = calls.borrow();
    assert!(calls.released.is_empty());
    assert_eq!(calls.closed, 1);
    assert_eq!(calls.exits, 1);

    Ok(())
}

#[test]
fn test_over_reported_length_is_malformed() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let mut transport = MockTransport::new(calls.clone()).respond(vec![Ok(report(0, 0, 0))]);
    transport.over_report = 1;

    let mut driver = connect(transport)?;
    assert!(matches!(
        driver.poll_once(),
        Err(RunError::Decode(DecodeError::MalformedReport {
            expected: REPORT_SIZE,
            actual: 50
        }))
    ));
    assert!(driver.is_connected());

    Ok(())
}

#[test]
fn test_malformed_report_ends_run() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![Ok(vec![0x01; 12])]);

    let driver = connect(transport)?;
    let result = driver.run(|_, _| panic!("observer should not be called"));

    assert!(matches!(result, Err(RunError::Decode(_))));
    assert_eq!(calls.borrow().closed, 1);

    Ok(())
}

#[test]
fn test_held_button_has_single_edge() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![
        Ok(report(0, 0x10, 0)),
        Ok(report(0, 0x10, 0)),
        Ok(report(0, 0x00, 0)),
        Ok(report(0, 0x10, 0)),
    ]);

    let driver = connect(transport)?;
    let mut seen: Vec<(bool, ButtonSet)> = Vec::new();
    driver.run(|update, stop| {
        seen.push((update.state.is_pressed(Button::Triangle), update.pressed));
        if seen.len() == 4 {
            stop.stop();
        }
    })?;

    let triangle: ButtonSet = [Button::Triangle].into_iter().collect();
    assert_eq!(seen[0], (true, triangle));
    assert_eq!(seen[1], (true, ButtonSet::empty()));
    assert_eq!(seen[2], (false, ButtonSet::empty()));
    assert_eq!(seen[3], (true, triangle));

    Ok(())
}

#[test]
fn test_stop_before_run() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![Ok(report(0, 0, 0))]);

    let driver = connect(transport)?;
    let stop = driver.stop_handle();
    stop.stop();
    stop.stop();
    assert!(!stop.is_running());

    driver.run(|_, _| panic!("observer should not be called"))?;
    let calls = calls.borrow();
    assert_eq!(calls.polls, 0);
    assert_eq!(calls.closed, 1);

    Ok(())
}

#[test]
fn test_stop_interrupts_poll_interval() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let transport = MockTransport::new(calls.clone()).respond(vec![Ok(report(0, 0, 0))]);
    let options = DriverOptions {
        poll_interval: Duration::from_secs(30),
        ..Default::default()
    };

    let driver = Driver::connect(transport, &options)?;
    let mut remote = None;

    let start = Instant::now();
    driver.run(|_, stop| {
        // Stop from another thread while the session waits for the next tick
        let stop = stop.clone();
        remote = Some(std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stop.stop();
        }));
    })?;
    if let Some(remote) = remote {
        remote.join().expect("stop thread should finish");
    }

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(calls.borrow().polls, 1);

    Ok(())
}

#[test]
fn test_drop_disconnects() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let driver = connect(MockTransport::new(calls.clone()))?;
    drop(driver);

    let calls = calls.borrow();
    assert_eq!(calls.released, vec![0]);
    assert_eq!(calls.closed, 1);

    Ok(())
}

#[test]
fn test_stop_handle_is_shared() {
    let stop = StopHandle::new();
    let other = stop.clone();
    assert!(stop.is_running());
    other.stop();
    assert!(!stop.is_running());
}
