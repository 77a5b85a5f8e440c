//! [Transport] implementation backed by nusb

use std::collections::HashMap;
use std::time::Duration;

use nusb::descriptors::ConfigurationDescriptor;
use nusb::transfer::{ControlIn, ControlOut, ControlType, TransferError};
use nusb::MaybeFuture;

use super::{
    ControlRequest, Direction, Recipient, RequestType, Transport, TransportError, UsbDeviceInfo,
    ERROR_IO, ERROR_NO_DEVICE, ERROR_OTHER, ERROR_PIPE, ERROR_TIMEOUT,
};

/// Opened device and the interfaces claimed on it
pub struct NusbHandle {
    device: nusb::Device,
    interfaces: HashMap<u8, nusb::Interface>,
    auto_detach: bool,
}

/// USB transport using the nusb crate in blocking mode
#[derive(Debug, Default)]
pub struct NusbTransport {}

impl NusbTransport {
    pub fn new() -> Self {
        Self {}
    }
}

impl Transport for NusbTransport {
    type Handle = NusbHandle;

    fn init(&mut self, debug: bool) -> Result<(), TransportError> {
        if debug {
            log::debug!("USB transport debug logging enabled");
        }
        // nusb has no global context; make sure the platform backend answers.
        let _ = nusb::list_devices().wait()?;
        Ok(())
    }

    fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Option<Self::Handle>, TransportError> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| d.vendor_id() == vendor_id && d.product_id() == product_id);
        let Some(dev_info) = dev_info else {
            return Ok(None);
        };

        let device = dev_info.open().wait()?;
        Ok(Some(NusbHandle {
            device,
            interfaces: HashMap::new(),
            auto_detach: false,
        }))
    }

    fn set_auto_detach_kernel_driver(
        &mut self,
        handle: &mut Self::Handle,
        enable: bool,
    ) -> Result<(), TransportError> {
        handle.auto_detach = enable;
        Ok(())
    }

    fn interfaces(&mut self, handle: &Self::Handle) -> Result<Vec<u8>, TransportError> {
        let config: ConfigurationDescriptor = handle.device.active_configuration()?;
        let mut numbers: Vec<u8> = config
            .interfaces()
            .map(|iface| iface.interface_number())
            .collect();
        numbers.dedup();

        Ok(numbers)
    }

    fn claim_interface(
        &mut self,
        handle: &mut Self::Handle,
        iface: u8,
    ) -> Result<(), TransportError> {
        // On Linux, detach kernel driver before claiming (e.g., usbhid)
        #[cfg(target_os = "linux")]
        let interface = if handle.auto_detach {
            handle.device.detach_and_claim_interface(iface).wait()?
        } else {
            handle.device.claim_interface(iface).wait()?
        };
        #[cfg(not(target_os = "linux"))]
        let interface = handle.device.claim_interface(iface).wait()?;

        handle.interfaces.insert(iface, interface);
        Ok(())
    }

    fn release_interface(
        &mut self,
        handle: &mut Self::Handle,
        iface: u8,
    ) -> Result<(), TransportError> {
        // Dropping the interface releases it
        match handle.interfaces.remove(&iface) {
            Some(_) => Ok(()),
            None => Err(TransportError::NotClaimed(iface)),
        }
    }

    fn control_transfer(
        &mut self,
        handle: &mut Self::Handle,
        request: &ControlRequest,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, i32> {
        let control_type = match request.request_type {
            RequestType::Standard => ControlType::Standard,
            RequestType::Class => ControlType::Class,
            RequestType::Vendor => ControlType::Vendor,
        };
        let recipient = match request.recipient {
            Recipient::Device => nusb::transfer::Recipient::Device,
            Recipient::Interface => nusb::transfer::Recipient::Interface,
            Recipient::Endpoint => nusb::transfer::Recipient::Endpoint,
            Recipient::Other => nusb::transfer::Recipient::Other,
        };

        match request.direction {
            Direction::In => {
                let data = handle
                    .device
                    .control_in(
                        ControlIn {
                            control_type,
                            recipient,
                            request: request.request,
                            value: request.value,
                            index: request.index,
                            length: buf.len() as u16,
                        },
                        timeout,
                    )
                    .wait()
                    .map_err(error_code)?;
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Direction::Out => {
                handle
                    .device
                    .control_out(
                        ControlOut {
                            control_type,
                            recipient,
                            request: request.request,
                            value: request.value,
                            index: request.index,
                            data: buf,
                        },
                        timeout,
                    )
                    .wait()
                    .map_err(error_code)?;
                Ok(buf.len())
            }
        }
    }

    fn close(&mut self, handle: Self::Handle) {
        let NusbHandle {
            device, interfaces, ..
        } = handle;
        drop(interfaces);
        drop(device);
    }

    fn exit(&mut self) {}
}

/// Map a nusb transfer error onto the transport error code table. nusb
/// cancels a transfer when its timeout expires.
fn error_code(err: TransferError) -> i32 {
    match err {
        TransferError::Cancelled => ERROR_TIMEOUT,
        TransferError::Stall => ERROR_PIPE,
        TransferError::Disconnected => ERROR_NO_DEVICE,
        TransferError::Fault => ERROR_IO,
        _ => ERROR_OTHER,
    }
}

/// Returns every attached USB device, optionally filtered by vendor id
pub fn list_devices(vendor_id: Option<u16>) -> Result<Vec<UsbDeviceInfo>, TransportError> {
    let mut devices: Vec<UsbDeviceInfo> = nusb::list_devices()
        .wait()?
        .filter(|d| vendor_id.map_or(true, |vid| d.vendor_id() == vid))
        .map(|d| UsbDeviceInfo {
            #[cfg(target_os = "linux")]
            bus_number: d.busnum(),
            #[cfg(not(target_os = "linux"))]
            bus_number: 0,
            device_address: d.device_address(),
            vendor_id: d.vendor_id(),
            product_id: d.product_id(),
            manufacturer: d.manufacturer_string().unwrap_or_default().to_string(),
            product: d.product_string().unwrap_or_default().to_string(),
        })
        .collect();

    devices.sort_by_key(|d| (d.bus_number, d.device_address));
    Ok(devices)
}
