use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::transport::{
    ControlRequest, Direction, Recipient, RequestType, Transport, ERROR_NO_DEVICE, ERROR_TIMEOUT,
};

use super::{
    error::{ConnectError, DecodeError, PollError, RunError},
    hid_report::PackedInputDataReport,
    state::{ButtonSet, ControllerState},
};

// Hardware ID's
pub const VID: u16 = 0x054C;
pub const PID: u16 = 0x0268;

// Input report
pub const REPORT_ID: u8 = 0x01;
pub const REPORT_SIZE: usize = 49;

// HID class requests
const HID_GET_REPORT: u8 = 0x01;

// Report types (in high byte of wValue)
const HID_REPORT_TYPE_INPUT: u16 = 0x01;

// Timeout for each report fetch
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Options used to establish a session
#[derive(Clone, Debug)]
pub struct DriverOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Time to wait between two polls. Zero polls as fast as the device answers.
    pub poll_interval: Duration,
    /// Raise the transport log verbosity
    pub debug: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            vendor_id: VID,
            product_id: PID,
            poll_interval: Duration::ZERO,
            debug: false,
        }
    }
}

/// Cloneable handle used to ask a running session to stop. The session checks
/// it before every iteration, so a stop requested while an iteration runs
/// takes effect once that iteration completes.
#[derive(Clone, Debug)]
pub struct StopHandle {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    /// Request the session to stop. Calling this more than once has no
    /// further effect.
    pub fn stop(&self) {
        let (running, cvar) = &*self.inner;
        let mut running = running.lock().unwrap_or_else(PoisonError::into_inner);
        if !*running {
            return;
        }
        log::info!("Stopping...");
        *running = false;
        cvar.notify_all();
    }

    pub fn is_running(&self) -> bool {
        let (running, _) = &*self.inner;
        *running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`, returning early if a stop is requested
    fn wait_timeout(&self, timeout: Duration) {
        let (running, cvar) = &*self.inner;
        let guard = running.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = cvar
            .wait_timeout_while(guard, timeout, |running| *running)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Paces the poll loop. Waiting is interrupted as soon as a stop is requested.
#[derive(Clone, Copy, Debug)]
struct Ticker {
    interval: Duration,
}

impl Ticker {
    fn wait(&self, stop: &StopHandle) {
        if self.interval.is_zero() {
            return;
        }
        stop.wait_timeout(self.interval);
    }
}

/// Everything an observer receives for one successful poll
#[derive(Clone, Copy, Debug)]
pub struct Update<'a> {
    /// Decoded state of this poll
    pub state: &'a ControllerState,
    /// Buttons that were released in the previous poll and are pressed now
    pub pressed: ButtonSet,
    /// Raw report the state was decoded from
    pub report: &'a PackedInputDataReport,
}

/// Sixaxis controller session. Owns the open device and the interfaces
/// claimed on it until [Driver::disconnect] is called or the driver is
/// dropped.
pub struct Driver<T: Transport> {
    transport: T,
    handle: Option<T::Handle>,
    /// Interfaces that were successfully claimed
    interfaces: Vec<u8>,
    /// State decoded from the previous poll
    state: ControllerState,
    stop: StopHandle,
    ticker: Ticker,
}

impl<T: Transport> Driver<T> {
    /// Open the first device matching the configured identifiers and claim
    /// its interfaces. Interfaces that fail to claim are logged and skipped.
    pub fn connect(mut transport: T, options: &DriverOptions) -> Result<Self, ConnectError> {
        transport
            .init(options.debug)
            .map_err(ConnectError::TransportInit)?;

        let (vid, pid) = (options.vendor_id, options.product_id);
        log::info!("Opening device {vid:04X}:{pid:04X}...");
        let mut handle = match transport.open(vid, pid) {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                log::error!("Failed to find device {vid:04X}:{pid:04X}");
                transport.exit();
                return Err(ConnectError::DeviceNotFound {
                    vendor_id: vid,
                    product_id: pid,
                });
            }
            Err(e) => {
                log::error!("Failed to open device {vid:04X}:{pid:04X}: {e}");
                transport.exit();
                return Err(ConnectError::OpenFailed(e));
            }
        };

        if let Err(e) = transport.set_auto_detach_kernel_driver(&mut handle, true) {
            log::warn!("Unable to enable kernel driver auto-detach: {e}");
        }

        let ifaces = match transport.interfaces(&handle) {
            Ok(ifaces) => ifaces,
            Err(e) => {
                log::error!("Failed to read interfaces: {e}");
                transport.close(handle);
                transport.exit();
                return Err(ConnectError::OpenFailed(e));
            }
        };
        log::info!("Interfaces: {}", ifaces.len());

        let mut interfaces = Vec::with_capacity(ifaces.len());
        for iface in ifaces {
            log::debug!("Claiming interface {iface}...");
            match transport.claim_interface(&mut handle, iface) {
                Ok(_) => interfaces.push(iface),
                Err(e) => log::warn!("Failed to claim interface {iface}: {e}"),
            }
        }

        Ok(Self {
            transport,
            handle: Some(handle),
            interfaces,
            state: ControllerState::default(),
            stop: StopHandle::new(),
            ticker: Ticker {
                interval: options.poll_interval,
            },
        })
    }

    /// Returns a handle that can be used to stop the session
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns the interfaces currently claimed by this session
    pub fn claimed_interfaces(&self) -> &[u8] {
        &self.interfaces
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Fetch the current input report from the device
    pub fn poll_report(&mut self) -> Result<PackedInputDataReport, RunError> {
        let mut buf = [0; REPORT_SIZE];
        let bytes_read = self.read_report(&mut buf)?;
        log::trace!("Got report of {bytes_read} bytes");

        // The transport may report more bytes than the buffer holds
        let Some(data) = buf.get(..bytes_read) else {
            return Err(DecodeError::MalformedReport {
                expected: REPORT_SIZE,
                actual: bytes_read,
            }
            .into());
        };
        let report = PackedInputDataReport::from_buffer(data)?;
        Ok(report)
    }

    /// Fetch and decode the current input report
    pub fn poll_once(&mut self) -> Result<ControllerState, RunError> {
        Ok(self.poll_report()?.state())
    }

    /// Issue the HID GET_REPORT request for the input report
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize, PollError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(PollError::TransferError(ERROR_NO_DEVICE));
        };

        // GET_REPORT: bmRequestType=0xA1, bRequest=0x01
        // wValue = (report_type << 8) | report_id
        let request = ControlRequest {
            direction: Direction::In,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request: HID_GET_REPORT,
            value: (HID_REPORT_TYPE_INPUT << 8) | REPORT_ID as u16,
            index: 0,
        };

        match self
            .transport
            .control_transfer(handle, &request, buf, TRANSFER_TIMEOUT)
        {
            Ok(bytes_read) => Ok(bytes_read),
            Err(ERROR_TIMEOUT) => Err(PollError::Timeout),
            Err(code) => Err(PollError::TransferError(code)),
        }
    }

    /// Poll the device until a stop is requested or an error occurs. The
    /// observer is called after every successful poll and may stop the
    /// session through the given [StopHandle]. The device is always
    /// disconnected before this returns.
    pub fn run<F>(mut self, mut observer: F) -> Result<(), RunError>
    where
        F: FnMut(&Update<'_>, &StopHandle),
    {
        let result = self.run_loop(&mut observer);
        if result.is_err() {
            log::debug!("Session terminated by error");
        }
        self.disconnect();
        result
    }

    fn run_loop<F>(&mut self, observer: &mut F) -> Result<(), RunError>
    where
        F: FnMut(&Update<'_>, &StopHandle),
    {
        let stop = self.stop.clone();
        while stop.is_running() {
            let report = self.poll_report()?;
            let state = report.state();
            let pressed = state.pressed_since(&self.state);
            self.state = state;

            let update = Update {
                state: &state,
                pressed,
                report: &report,
            };
            observer(&update, &stop);

            self.ticker.wait(&stop);
        }

        Ok(())
    }

    /// Release all claimed interfaces and close the device. Failures are
    /// logged and otherwise ignored. Does nothing if already disconnected.
    pub fn disconnect(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        for iface in self.interfaces.drain(..) {
            log::info!("Releasing interface {iface}...");
            if let Err(e) = self.transport.release_interface(&mut handle, iface) {
                log::warn!("Failed to release interface {iface}: {e}");
            }
        }

        log::info!("Closing device...");
        self.transport.close(handle);
        self.transport.exit();
    }
}

impl<T: Transport> Drop for Driver<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
