//! moth-hid-core: AudioMoth discovery, configuration codec, and control commands.
//!
//! This crate provides the logic for reading and changing the configuration
//! of AudioMoth acoustic recorders over USB HID, and for moving that
//! configuration between the device's volatile and flash storage.

pub mod device;
pub mod error;
pub mod hid;
pub mod manager;
pub mod protocol;
pub mod record;
pub mod safety;
pub mod transport;

pub use device::DeviceDescriptor;
pub use error::{Error, Result};
pub use record::{ConfigurationRecord, Field, Overrides};

/// Substring of the USB product string identifying an AudioMoth.
pub const PRODUCT_NAME: &str = "AudioMoth";
