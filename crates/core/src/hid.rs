//! hidapi-backed implementation of the transport traits.

use crate::device::DeviceDescriptor;
use crate::error::Result;
use crate::transport::{HidBackend, HidTransport};
use hidapi::{HidApi, HidDevice, HidError};
use std::ffi::CString;
use std::sync::Mutex;
use tracing::debug;

/// Default time to wait for a device reply.
pub const DEFAULT_READ_TIMEOUT_MS: i32 = 1000;

/// The recorder uses unnumbered reports; hidapi still expects a report ID
/// as the first byte of every write.
const REPORT_ID: u8 = 0x00;

/// Backend over the system HID library.
pub struct HidApiBackend {
    api: Mutex<HidApi>,
    read_timeout_ms: i32,
}

impl HidApiBackend {
    /// Initialise hidapi with the default read timeout.
    pub fn new() -> Result<Self> {
        Self::with_read_timeout(DEFAULT_READ_TIMEOUT_MS)
    }

    pub fn with_read_timeout(read_timeout_ms: i32) -> Result<Self> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Mutex::new(api),
            read_timeout_ms,
        })
    }
}

fn poisoned() -> HidError {
    HidError::HidApiError {
        message: "hidapi handle poisoned by an earlier panic".to_string(),
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut api = self.api.lock().map_err(|_| poisoned())?;
        api.refresh_devices()?;

        Ok(api
            .device_list()
            .map(|info| DeviceDescriptor {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                product_string: info.product_string().map(str::to_string),
                serial_number: info.serial_number().map(str::to_string),
                path: info.path().to_string_lossy().into_owned(),
            })
            .collect())
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn HidTransport>> {
        let path = CString::new(device.path.as_str()).map_err(|e| HidError::HidApiError {
            message: format!("invalid device path {:?}: {e}", device.path),
        })?;
        let api = self.api.lock().map_err(|_| poisoned())?;
        let handle = api.open_path(&path)?;
        debug!(path = %device.path, "Opened HID session");

        Ok(Box::new(HidSession {
            device: handle,
            read_timeout_ms: self.read_timeout_ms,
        }))
    }
}

/// An open hidapi device. Closed when dropped.
struct HidSession {
    device: HidDevice,
    read_timeout_ms: i32,
}

impl HidTransport for HidSession {
    fn write(&self, data: &[u8]) -> Result<usize> {
        let mut report = Vec::with_capacity(data.len() + 1);
        report.push(REPORT_ID);
        report.extend_from_slice(data);
        let written = self.device.write(&report)?;
        Ok(written.saturating_sub(1))
    }

    fn read(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.device.read_timeout(&mut buf, self.read_timeout_ms)?;
        buf.truncate(n);
        Ok(buf)
    }
}
