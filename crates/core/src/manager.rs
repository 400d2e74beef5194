//! Configuration operations: read, write, persist, and restore.
//!
//! Each operation locates the device, opens its own HID session, and
//! closes it before returning. Nothing is retried; a failed step ends the
//! operation.
//!
//! `write_config` runs through:
//!   1. locate the device
//!   2. read the current configuration (own session)
//!   3. validate every override, then merge
//!   4. encode and write with the CONFIGURATION tag (new session)

use crate::device::{self, DeviceDescriptor};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{self, Command, CONFIG_MESSAGE_LEN};
use crate::record::{ConfigurationRecord, Overrides};
use crate::transport::{receive, send, send_command, HidBackend};
use tracing::{debug, info, warn};

/// Read the device's active (volatile) configuration.
pub fn read_config(backend: &dyn HidBackend, serial: Option<&str>) -> Result<ConfigurationRecord> {
    let device = device::find(backend, serial)?;
    read_from(backend, &device)
}

fn read_from(backend: &dyn HidBackend, device: &DeviceDescriptor) -> Result<ConfigurationRecord> {
    let session = backend.open(device)?;
    send_command(session.as_ref(), Command::Read)?;
    let data = receive(session.as_ref(), CONFIG_MESSAGE_LEN)?;

    let (tag, record) = protocol::decode(&data)?;
    if tag != Command::Read.tag() {
        warn!(
            expected = format_args!("0x{:02X}", Command::Read.tag()),
            actual = format_args!("0x{:02X}", tag),
            "Unexpected response to READ"
        );
        return Err(ProtocolError::UnexpectedTag {
            expected: Command::Read.tag(),
            actual: tag,
        }
        .into());
    }

    debug!(?record, "Read configuration");
    Ok(record)
}

/// Merge `overrides` into the device's current configuration and write it.
///
/// Every override is validated before anything is written; if one fails, the
/// device receives no configuration message. Returns the configuration now in
/// effect on the device.
pub fn write_config(
    backend: &dyn HidBackend,
    serial: Option<&str>,
    overrides: &Overrides,
) -> Result<ConfigurationRecord> {
    let device = device::find(backend, serial)?;
    let current = read_from(backend, &device)?;

    let merged = overrides.merge_into(&current).map_err(|e| {
        warn!(error = %e, "Rejected configuration override");
        Error::from(e)
    })?;
    debug!(changes = overrides.iter().count(), "Overrides validated");

    let message = protocol::encode(Command::Configuration.tag(), &merged);
    let session = backend.open(&device)?;
    send(session.as_ref(), &message)?;

    for (field, value) in overrides.iter() {
        info!(field = field.name(), from = current.get(field), to = value, "Configuration updated");
    }
    Ok(merged)
}

/// Copy the device's volatile configuration into flash.
pub fn persist(backend: &dyn HidBackend, serial: Option<&str>) -> Result<()> {
    command(backend, serial, Command::Persist)?;
    info!("Configuration persisted to flash");
    Ok(())
}

/// Replace the device's volatile configuration with the persisted one.
pub fn restore(backend: &dyn HidBackend, serial: Option<&str>) -> Result<()> {
    command(backend, serial, Command::Restore)?;
    info!("Configuration restored from flash");
    Ok(())
}

fn command(backend: &dyn HidBackend, serial: Option<&str>, command: Command) -> Result<()> {
    let device = device::find(backend, serial)?;
    let session = backend.open(&device)?;
    send_command(session.as_ref(), command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::record::Field;
    use crate::transport::mock::MockBackend;

    const SERIAL: &str = "24F3190363DA2A2F";

    fn current() -> ConfigurationRecord {
        ConfigurationRecord {
            time: 1_700_000_000,
            gain: 2,
            clock_divider: 4,
            acquisition_cycles: 16,
            oversample_rate: 1,
            sample_rate: 384_000,
            sample_rate_divider: 1,
            lower_filter_freq: 0,
            higher_filter_freq: 0,
        }
    }

    fn backend() -> MockBackend {
        MockBackend::new().with_moth(SERIAL, current())
    }

    #[test]
    fn read_config_sends_read_and_decodes() {
        let backend = backend();
        let record = read_config(&backend, Some(SERIAL)).unwrap();
        assert_eq!(record, current());

        let device = backend.device(SERIAL);
        assert_eq!(device.writes(), vec![vec![0x05]]);
        assert_eq!(device.reads(), 1);
        assert_eq!(device.sessions(), (1, 1));
    }

    #[test]
    fn read_config_rejects_wrong_tag() {
        let backend = backend();
        let reply = protocol::encode(Command::Configuration.tag(), &current());
        backend.device(SERIAL).reply_with(reply.to_vec());

        let err = read_config(&backend, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedTag {
                expected: 0x05,
                actual: 0x01
            })
        ));
    }

    #[test]
    fn read_config_rejects_short_reply() {
        let backend = backend();
        backend.device(SERIAL).reply_with(vec![0x05, 0x00, 0x00]);
        assert!(matches!(
            read_config(&backend, None),
            Err(Error::Protocol(ProtocolError::WrongLength {
                expected: 18,
                actual: 3
            }))
        ));
    }

    #[test]
    fn read_config_timeout_is_protocol_error() {
        let backend = backend();
        backend.device(SERIAL).reply_with(Vec::new());
        assert!(matches!(
            read_config(&backend, None),
            Err(Error::Protocol(ProtocolError::WrongLength { actual: 0, .. }))
        ));
        assert_eq!(backend.device(SERIAL).sessions(), (1, 1));
    }

    #[test]
    fn write_config_merges_single_field() {
        let backend = backend();
        let merged =
            write_config(&backend, Some(SERIAL), &Overrides::new().with(Field::Gain, 3)).unwrap();

        assert_eq!(merged.gain(), 3);
        assert_eq!(merged.sample_rate(), 384_000);
        assert_eq!(merged.lower_filter_freq(), 0);

        let device = backend.device(SERIAL);
        let writes = device.config_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 18);
        assert_eq!(writes[0][0], 0x01);
        assert_eq!(protocol::decode(&writes[0]).unwrap().1, merged);
        assert_eq!(device.volatile(), merged);
    }

    #[test]
    fn write_config_rejects_invalid_gain_without_writing() {
        let backend = backend();
        let err =
            write_config(&backend, None, &Overrides::new().with(Field::Gain, 7)).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::Range {
                field: Field::Gain,
                value: 7,
                ..
            })
        ));

        let device = backend.device(SERIAL);
        assert!(device.config_writes().is_empty());
        assert_eq!(device.volatile(), current());
        // Only the read session was opened.
        assert_eq!(device.sessions(), (1, 1));
    }

    #[test]
    fn write_config_validates_filters_against_new_sample_rate() {
        let backend = backend();
        let overrides = Overrides::new()
            .with(Field::SampleRate, 8000)
            .with(Field::HigherFilterFreq, 4500);
        assert!(matches!(
            write_config(&backend, None, &overrides),
            Err(Error::Validation(ValidationError::Range {
                field: Field::HigherFilterFreq,
                ..
            }))
        ));
        assert!(backend.device(SERIAL).config_writes().is_empty());
    }

    #[test]
    fn write_config_one_bad_override_blocks_all() {
        let backend = backend();
        let overrides = Overrides::new()
            .with(Field::Gain, 1)
            .with(Field::ClockDivider, 8)
            .with(Field::LowerFilterFreq, 150);
        assert!(write_config(&backend, None, &overrides).is_err());
        assert!(backend.device(SERIAL).config_writes().is_empty());
        assert_eq!(backend.device(SERIAL).volatile(), current());
    }

    #[test]
    fn write_config_without_overrides_rewrites_current() {
        let backend = backend();
        let merged = write_config(&backend, None, &Overrides::new()).unwrap();
        assert_eq!(merged, current());
        assert_eq!(backend.device(SERIAL).config_writes().len(), 1);
    }

    #[test]
    fn write_config_propagates_transport_error() {
        let backend = backend();
        backend.device(SERIAL).fail_writes("broken pipe");
        let err = write_config(&backend, None, &Overrides::new().with(Field::Gain, 1)).unwrap_err();
        assert!(matches!(err, Error::Hid(_)));
    }

    #[test]
    fn persist_writes_single_byte_and_no_read() {
        let backend = backend();
        persist(&backend, None).unwrap();
        let device = backend.device(SERIAL);
        assert_eq!(device.writes(), vec![vec![0x06]]);
        assert_eq!(device.reads(), 0);
    }

    #[test]
    fn restore_writes_single_byte_and_no_read() {
        let backend = backend();
        restore(&backend, Some(SERIAL)).unwrap();
        let device = backend.device(SERIAL);
        assert_eq!(device.writes(), vec![vec![0x04]]);
        assert_eq!(device.reads(), 0);
    }

    #[test]
    fn operations_fail_without_device() {
        let backend = MockBackend::new();
        assert!(matches!(read_config(&backend, None), Err(Error::NotFound(_))));
        assert!(matches!(persist(&backend, None), Err(Error::NotFound(_))));
        assert!(matches!(restore(&backend, None), Err(Error::NotFound(_))));
        assert!(matches!(
            write_config(&backend, None, &Overrides::new()),
            Err(Error::NotFound(_))
        ));
    }
}
