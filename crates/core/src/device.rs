//! Device discovery: enumeration, product filtering, and serial disambiguation.

use crate::error::{Error, Result};
use crate::transport::HidBackend;
use crate::PRODUCT_NAME;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Information about an enumerated HID device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_string: Option<String>,
    pub serial_number: Option<String>,
    /// Platform-specific device path used to open the device.
    pub path: String,
}

impl DeviceDescriptor {
    /// Whether the product string names an AudioMoth (case-sensitive).
    pub fn is_audiomoth(&self) -> bool {
        self.product_string
            .as_deref()
            .is_some_and(|p| p.contains(PRODUCT_NAME))
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (VID: 0x{:04X}, PID: 0x{:04X}, serial: {}, path: {})",
            self.product_string.as_deref().unwrap_or("<unknown>"),
            self.vendor_id,
            self.product_id,
            self.serial_number.as_deref().unwrap_or("<none>"),
            self.path
        )
    }
}

/// Every attached HID device, unfiltered.
pub fn enumerate_all(backend: &dyn HidBackend) -> Result<Vec<DeviceDescriptor>> {
    debug!("Starting HID device enumeration");
    let devices = backend.enumerate()?;
    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

/// Every attached AudioMoth, in enumeration order. May be empty.
pub fn find_all(backend: &dyn HidBackend) -> Result<Vec<DeviceDescriptor>> {
    let moths: Vec<DeviceDescriptor> = enumerate_all(backend)?
        .into_iter()
        .filter(DeviceDescriptor::is_audiomoth)
        .collect();
    debug!(count = moths.len(), "AudioMoth candidates");
    Ok(moths)
}

/// Locate the AudioMoth to talk to.
///
/// With a serial number, the device whose serial matches exactly. Without
/// one, the first AudioMoth in enumeration order; pass a serial when more
/// than one recorder may be attached.
pub fn find(backend: &dyn HidBackend, serial: Option<&str>) -> Result<DeviceDescriptor> {
    let candidates = find_all(backend)?;
    if candidates.is_empty() {
        return Err(Error::NotFound(format!("no {PRODUCT_NAME} connected")));
    }

    let total = candidates.len();
    let found = match serial {
        Some(serial) => candidates
            .into_iter()
            .find(|d| d.serial_number.as_deref() == Some(serial))
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no {PRODUCT_NAME} with serial number {serial} among {total} connected"
                ))
            })?,
        None => {
            if total > 1 {
                debug!(
                    skipped = total - 1,
                    "Multiple devices attached and no serial given; using the first"
                );
            }
            candidates
                .into_iter()
                .next()
                .ok_or_else(|| Error::NotFound(format!("no {PRODUCT_NAME} connected")))?
        }
    };

    info!(
        serial = found.serial_number.as_deref().unwrap_or("<none>"),
        vid = format_args!("0x{:04X}", found.vendor_id),
        pid = format_args!("0x{:04X}", found.product_id),
        path = %found.path,
        "Found AudioMoth"
    );
    Ok(found)
}
