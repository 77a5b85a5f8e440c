use std::error::Error;

use sixaxis::config::Config;
use sixaxis::transport::usb::list_devices;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct UsbDeviceRow {
    #[tabled(rename = "Bus")]
    bus: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Target")]
    target: String,
}

pub async fn handle_devices(
    config: &Config,
    vendor_id: Option<u16>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let devices = tokio::task::spawn_blocking(move || list_devices(vendor_id)).await??;
    let count = devices.len();

    let rows: Vec<UsbDeviceRow> = devices
        .into_iter()
        .map(|device| {
            let is_target =
                device.vendor_id == config.vendor_id && device.product_id == config.product_id;
            UsbDeviceRow {
                bus: format!("{:03}", device.bus_number),
                address: format!("{:03}", device.device_address),
                id: format!("{:04x}:{:04x}", device.vendor_id, device.product_id),
                manufacturer: device.manufacturer,
                product: device.product,
                target: if is_target { "yes" } else { "" }.to_string(),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("USB Devices"));
    println!("{table}");
    println!("Found {count} device(s)");

    Ok(())
}
