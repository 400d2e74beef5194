//! Safety layer: validates every configuration override against the
//! recorder's known-valid ranges before anything is sent to the device.
//!
//! # AudioMoth Configuration Bounds
//!
//! ## Gain
//! - **Supported values**: 0, 1, 2, 3, 4 (low to high)
//!
//! ## Sample Rate
//! - **Supported values**: 8, 16, 32, 48, 96, 192, 250 and 384 kHz
//!
//! ## Band-pass Filter
//! - **Step size**: 100 Hz
//! - **Upper bound**: half the effective sample rate (Nyquist), using integer
//!   division
//! - The effective sample rate is the one being written in the same request,
//!   if any, otherwise the one the device currently reports.
//!
//! ## Pass-through Fields
//! - `time`, `clock_divider`, `acquisition_cycles`, `oversample_rate` and
//!   `sample_rate_divider` are only checked to fit their wire type. Their
//!   meaning is owned by the firmware.
//!
//! ## Safety Invariants
//! 1. Filter and pass-through values must fit the field's unsigned wire type
//! 2. Only enumerated gain and sample rate values are accepted; anything
//!    else, including values too wide for the wire, is a range error
//! 3. All validation happens BEFORE any configuration write

use crate::error::ValidationError;
use crate::record::Field;

/// Accepted gain settings.
pub const GAIN_VALUES: &[u8] = &[0, 1, 2, 3, 4];

/// Accepted sample rates in Hz.
pub const SAMPLE_RATES: &[u32] = &[8000, 16000, 32000, 48000, 96000, 192000, 250000, 384000];

/// Filter frequencies must be a multiple of this, in Hz.
pub const FILTER_FREQ_STEP: i64 = 100;

/// Validate a single override.
///
/// `effective_sample_rate` is only consulted for the two filter fields.
pub fn validate(
    field: Field,
    value: i64,
    effective_sample_rate: u32,
) -> Result<(), ValidationError> {
    match field {
        Field::Gain => {
            if !GAIN_VALUES.iter().any(|&g| i64::from(g) == value) {
                return Err(ValidationError::Range {
                    field,
                    value,
                    reason: format!("must be one of {GAIN_VALUES:?}"),
                });
            }
        }
        Field::SampleRate => {
            if !SAMPLE_RATES.iter().any(|&sr| i64::from(sr) == value) {
                return Err(ValidationError::Range {
                    field,
                    value,
                    reason: format!("must be one of {SAMPLE_RATES:?}"),
                });
            }
        }
        Field::LowerFilterFreq | Field::HigherFilterFreq => {
            check_wire_type(field, value)?;
            let nyquist = i64::from(effective_sample_rate / 2);
            if value % FILTER_FREQ_STEP != 0 || value > nyquist {
                return Err(ValidationError::Range {
                    field,
                    value,
                    reason: format!(
                        "must be a multiple of {FILTER_FREQ_STEP} Hz and at most {nyquist} Hz \
                         (half of sample rate {effective_sample_rate} Hz)"
                    ),
                });
            }
        }
        Field::Time
        | Field::ClockDivider
        | Field::AcquisitionCycles
        | Field::OversampleRate
        | Field::SampleRateDivider => check_wire_type(field, value)?,
    }

    Ok(())
}

/// Name of the unsigned integer type a field occupies on the wire.
pub fn wire_type_name(field: Field) -> &'static str {
    match field.width() {
        4 => "u32",
        2 => "u16",
        _ => "u8",
    }
}

/// Largest value a field can carry on the wire.
pub fn wire_max(field: Field) -> i64 {
    match field.width() {
        4 => i64::from(u32::MAX),
        2 => i64::from(u16::MAX),
        _ => i64::from(u8::MAX),
    }
}

fn check_wire_type(field: Field, value: i64) -> Result<(), ValidationError> {
    if !(0..=wire_max(field)).contains(&value) {
        return Err(ValidationError::TypeMismatch {
            field,
            ty: wire_type_name(field),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Convert a checked value to the field's storage type.
pub(crate) fn narrow<T: TryFrom<i64>>(field: Field, value: i64) -> Result<T, ValidationError> {
    T::try_from(value).map_err(|_| ValidationError::TypeMismatch {
        field,
        ty: wire_type_name(field),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_range(r: Result<(), ValidationError>) -> bool {
        matches!(r, Err(ValidationError::Range { .. }))
    }

    fn is_type_mismatch(r: Result<(), ValidationError>) -> bool {
        matches!(r, Err(ValidationError::TypeMismatch { .. }))
    }

    #[test]
    fn gain_accepts_enumerated_values() {
        for g in 0..=4 {
            assert!(validate(Field::Gain, g, 48000).is_ok());
        }
    }

    #[test]
    fn gain_rejects_out_of_set() {
        assert!(is_range(validate(Field::Gain, 5, 48000)));
        assert!(is_range(validate(Field::Gain, 7, 48000)));
        assert!(is_range(validate(Field::Gain, 255, 48000)));
    }

    #[test]
    fn sample_rate_accepts_known() {
        for &sr in SAMPLE_RATES {
            assert!(validate(Field::SampleRate, sr.into(), 0).is_ok());
        }
    }

    #[test]
    fn sample_rate_rejects_unknown() {
        assert!(is_range(validate(Field::SampleRate, 44100, 48000)));
        assert!(is_range(validate(Field::SampleRate, 0, 48000)));
        assert!(is_range(validate(Field::SampleRate, 384001, 48000)));
    }

    #[test]
    fn filter_must_be_step_aligned() {
        assert!(validate(Field::LowerFilterFreq, 1200, 48000).is_ok());
        assert!(is_range(validate(Field::LowerFilterFreq, 1250, 48000)));
        assert!(is_range(validate(Field::HigherFilterFreq, 99, 48000)));
    }

    #[test]
    fn filter_bounded_by_nyquist() {
        assert!(validate(Field::HigherFilterFreq, 4000, 8000).is_ok());
        assert!(is_range(validate(Field::HigherFilterFreq, 4100, 8000)));
        assert!(is_range(validate(Field::HigherFilterFreq, 4500, 8000)));
        assert!(validate(Field::HigherFilterFreq, 4500, 16000).is_ok());
        assert!(validate(Field::LowerFilterFreq, 0, 8000).is_ok());
    }

    #[test]
    fn filter_nyquist_uses_integer_division() {
        // 250000 / 2 = 125000, which does not fit u16 anyway; 65500 is the
        // largest aligned value that does.
        assert!(validate(Field::HigherFilterFreq, 65500, 250000).is_ok());
        assert!(is_range(validate(Field::LowerFilterFreq, 100, 199)));
        assert!(validate(Field::LowerFilterFreq, 100, 200).is_ok());
    }

    #[test]
    fn passthrough_fields_accept_any_wire_value() {
        for field in [
            Field::ClockDivider,
            Field::AcquisitionCycles,
            Field::OversampleRate,
            Field::SampleRateDivider,
        ] {
            assert!(validate(field, 0, 0).is_ok());
            assert!(validate(field, 255, 0).is_ok());
        }
        assert!(validate(Field::Time, i64::from(u32::MAX), 0).is_ok());
    }

    #[test]
    fn values_must_fit_wire_type() {
        assert!(is_type_mismatch(validate(Field::ClockDivider, 256, 0)));
        assert!(is_type_mismatch(validate(Field::SampleRateDivider, -1, 0)));
        assert!(is_type_mismatch(validate(
            Field::Time,
            i64::from(u32::MAX) + 1,
            0
        )));
        assert!(is_type_mismatch(validate(Field::LowerFilterFreq, 70000, 384000)));
    }

    #[test]
    fn enumerated_fields_report_range_outside_wire_width() {
        assert!(is_range(validate(Field::Gain, -1, 48000)));
        assert!(is_range(validate(Field::Gain, 256, 48000)));
        assert!(is_range(validate(Field::SampleRate, -8000, 48000)));
        assert!(is_range(validate(
            Field::SampleRate,
            i64::from(u32::MAX) + 1,
            48000
        )));
    }

    #[test]
    fn validate_is_deterministic() {
        for field in Field::ALL {
            for value in [-5, 0, 1, 7, 100, 4000, 4500, 48000, 70000] {
                for sr in [0, 8000, 48000, 384000] {
                    let a = validate(field, value, sr);
                    let b = validate(field, value, sr);
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn narrow_converts_in_range() {
        let v: u16 = narrow(Field::LowerFilterFreq, 1200).unwrap();
        assert_eq!(v, 1200);
        assert!(narrow::<u8>(Field::Gain, 300).is_err());
    }
}
