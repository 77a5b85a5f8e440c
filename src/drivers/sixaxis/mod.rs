pub mod driver;
#[cfg(test)]
pub mod driver_test;
pub mod error;
pub mod hid_report;
pub mod state;
