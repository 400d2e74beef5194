//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface.

use crate::device::DeviceDescriptor;
use crate::error::Result;
use crate::protocol::Command;
use tracing::trace;

/// An open HID session with one device.
///
/// Dropping the value closes the session.
pub trait HidTransport: Send {
    /// Write one message to the device. Returns the number of bytes written.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Block until the device sends a report, returning at most `len` bytes.
    ///
    /// An empty result means the read timed out.
    fn read(&self, len: usize) -> Result<Vec<u8>>;
}

/// Enumerates devices and opens sessions on them.
pub trait HidBackend {
    /// All attached HID devices, unfiltered, in enumeration order.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open a session on a previously enumerated device.
    fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn HidTransport>>;
}

/// Send a raw message, logging it at trace level.
pub fn send(transport: &dyn HidTransport, data: &[u8]) -> Result<()> {
    trace!(
        len = data.len(),
        report_hex = format_args!("{:02X?}", data),
        "HID TX"
    );
    transport.write(data)?;
    Ok(())
}

/// Send a single-byte control command.
pub fn send_command(transport: &dyn HidTransport, command: Command) -> Result<()> {
    send(transport, &command.message())
}

/// Read one report of up to `len` bytes, logging it at trace level.
pub fn receive(transport: &dyn HidTransport, len: usize) -> Result<Vec<u8>> {
    let data = transport.read(len)?;
    trace!(
        len = data.len(),
        report_hex = format_args!("{:02X?}", data),
        "HID RX"
    );
    Ok(data)
}
