//! USB transport used by the device session.
//!
//! The session only talks to the hardware through the [Transport] trait so
//! that the lifecycle can be driven by something other than a real USB stack.

pub mod usb;

use std::time::Duration;

use thiserror::Error;

// Error codes returned by [Transport::control_transfer]. These follow the
// libusb error numbering.
pub const ERROR_IO: i32 = -1;
pub const ERROR_NO_DEVICE: i32 = -4;
pub const ERROR_TIMEOUT: i32 = -7;
pub const ERROR_PIPE: i32 = -9;
pub const ERROR_OTHER: i32 = -99;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("Unable to read active configuration: {0}")]
    Configuration(#[from] nusb::ActiveConfigurationError),

    #[error("Interface {0} is not claimed")]
    NotClaimed(u8),

    #[error("{0}")]
    Other(String),
}

/// Direction of a control transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Type field of bmRequestType
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
}

/// Recipient field of bmRequestType
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

/// Setup packet of a control transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlRequest {
    pub direction: Direction,
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

impl ControlRequest {
    /// Returns the bmRequestType byte for this request
    pub fn request_type_byte(&self) -> u8 {
        let direction = match self.direction {
            Direction::Out => 0x00,
            Direction::In => 0x80,
        };
        let request_type = match self.request_type {
            RequestType::Standard => 0x00,
            RequestType::Class => 0x20,
            RequestType::Vendor => 0x40,
        };
        let recipient = match self.recipient {
            Recipient::Device => 0x00,
            Recipient::Interface => 0x01,
            Recipient::Endpoint => 0x02,
            Recipient::Other => 0x03,
        };
        direction | request_type | recipient
    }
}

/// Summary of an attached USB device
#[derive(Clone, Debug)]
pub struct UsbDeviceInfo {
    pub bus_number: u8,
    pub device_address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String,
    pub product: String,
}

/// Capability the device session drives the hardware through
pub trait Transport {
    /// Opaque handle to an opened device
    type Handle;

    /// Initialize the USB context. `debug` raises the transport log verbosity.
    fn init(&mut self, debug: bool) -> Result<(), TransportError>;

    /// Open the first device matching the given identifiers. Returns `None`
    /// when no attached device matches.
    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError>;

    /// Detach any kernel driver bound to an interface when it is claimed
    fn set_auto_detach_kernel_driver(
        &mut self,
        handle: &mut Self::Handle,
        enable: bool,
    ) -> Result<(), TransportError>;

    /// Returns the interface numbers of the active configuration
    fn interfaces(&mut self, handle: &Self::Handle) -> Result<Vec<u8>, TransportError>;

    fn claim_interface(&mut self, handle: &mut Self::Handle, iface: u8)
        -> Result<(), TransportError>;

    fn release_interface(
        &mut self,
        handle: &mut Self::Handle,
        iface: u8,
    ) -> Result<(), TransportError>;

    /// Perform a synchronous control transfer. Returns the number of bytes
    /// transferred or a negative error code (see [ERROR_TIMEOUT] and friends).
    fn control_transfer(
        &mut self,
        handle: &mut Self::Handle,
        request: &ControlRequest,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, i32>;

    fn close(&mut self, handle: Self::Handle);

    /// Tear down the USB context
    fn exit(&mut self);
}
