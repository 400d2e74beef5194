//! AudioMoth HID configuration message encoding and decoding.
//!
//! Every message starts with a one-byte command tag. Read, persist and
//! restore are sent as the bare tag. A configuration message is the tag
//! followed by the 17-byte little-endian record:
//!
//! ```text
//! offset  size  field
//!      0     1  tag
//!      1     4  time
//!      5     1  gain
//!      6     1  clock_divider
//!      7     1  acquisition_cycles
//!      8     1  oversample_rate
//!      9     4  sample_rate
//!     13     1  sample_rate_divider
//!     14     2  lower_filter_freq
//!     16     2  higher_filter_freq
//! ```

use crate::error::{ProtocolError, Result};
use crate::record::ConfigurationRecord;

/// Length of a configuration message, tag included.
pub const CONFIG_MESSAGE_LEN: usize = 18;

/// Control commands understood by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Replace the volatile configuration.
    Configuration = 0x01,
    /// Copy persistent configuration back into volatile.
    Restore = 0x04,
    /// Ask for the volatile configuration.
    Read = 0x05,
    /// Copy volatile configuration into flash.
    Persist = 0x06,
}

impl Command {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The command as a single-byte message.
    pub fn message(self) -> [u8; 1] {
        [self.tag()]
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(tag: u8) -> std::result::Result<Self, u8> {
        match tag {
            0x01 => Ok(Self::Configuration),
            0x04 => Ok(Self::Restore),
            0x05 => Ok(Self::Read),
            0x06 => Ok(Self::Persist),
            other => Err(other),
        }
    }
}

/// Decode a configuration message into its tag and record.
pub fn decode(data: &[u8]) -> Result<(u8, ConfigurationRecord)> {
    let buf: &[u8; CONFIG_MESSAGE_LEN] =
        data.try_into().map_err(|_| ProtocolError::WrongLength {
            expected: CONFIG_MESSAGE_LEN,
            actual: data.len(),
        })?;

    let record = ConfigurationRecord {
        time: u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
        gain: buf[5],
        clock_divider: buf[6],
        acquisition_cycles: buf[7],
        oversample_rate: buf[8],
        sample_rate: u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]),
        sample_rate_divider: buf[13],
        lower_filter_freq: u16::from_le_bytes([buf[14], buf[15]]),
        higher_filter_freq: u16::from_le_bytes([buf[16], buf[17]]),
    };

    Ok((buf[0], record))
}

/// Encode a record behind the given tag. Total over all record values.
pub fn encode(tag: u8, record: &ConfigurationRecord) -> [u8; CONFIG_MESSAGE_LEN] {
    let mut buf = [0u8; CONFIG_MESSAGE_LEN];
    buf[0] = tag;
    buf[1..5].copy_from_slice(&record.time.to_le_bytes());
    buf[5] = record.gain;
    buf[6] = record.clock_divider;
    buf[7] = record.acquisition_cycles;
    buf[8] = record.oversample_rate;
    buf[9..13].copy_from_slice(&record.sample_rate.to_le_bytes());
    buf[13] = record.sample_rate_divider;
    buf[14..16].copy_from_slice(&record.lower_filter_freq.to_le_bytes());
    buf[16..18].copy_from_slice(&record.higher_filter_freq.to_le_bytes());
    buf
}
