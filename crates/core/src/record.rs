//! Typed AudioMoth configuration record, field tags, and partial overrides.

use crate::error::ValidationError;
use crate::safety;
use serde::Serialize;
use std::fmt;

/// Tunable device state, mirroring the 18-byte configuration message.
///
/// Outside this crate a record can only be obtained by decoding a device
/// message ([`crate::protocol::decode`]) or by merging validated
/// [`Overrides`] into an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfigurationRecord {
    pub(crate) time: u32,
    pub(crate) gain: u8,
    pub(crate) clock_divider: u8,
    pub(crate) acquisition_cycles: u8,
    pub(crate) oversample_rate: u8,
    pub(crate) sample_rate: u32,
    pub(crate) sample_rate_divider: u8,
    pub(crate) lower_filter_freq: u16,
    pub(crate) higher_filter_freq: u16,
}

impl ConfigurationRecord {
    /// Device clock, seconds since the Unix epoch.
    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn gain(&self) -> u8 {
        self.gain
    }

    pub fn clock_divider(&self) -> u8 {
        self.clock_divider
    }

    pub fn acquisition_cycles(&self) -> u8 {
        self.acquisition_cycles
    }

    pub fn oversample_rate(&self) -> u8 {
        self.oversample_rate
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_rate_divider(&self) -> u8 {
        self.sample_rate_divider
    }

    /// Lower band-pass filter frequency in Hz.
    pub fn lower_filter_freq(&self) -> u16 {
        self.lower_filter_freq
    }

    /// Higher band-pass filter frequency in Hz.
    pub fn higher_filter_freq(&self) -> u16 {
        self.higher_filter_freq
    }

    /// Read a field by tag, widened to `i64`.
    pub fn get(&self, field: Field) -> i64 {
        match field {
            Field::Time => self.time.into(),
            Field::Gain => self.gain.into(),
            Field::ClockDivider => self.clock_divider.into(),
            Field::AcquisitionCycles => self.acquisition_cycles.into(),
            Field::OversampleRate => self.oversample_rate.into(),
            Field::SampleRate => self.sample_rate.into(),
            Field::SampleRateDivider => self.sample_rate_divider.into(),
            Field::LowerFilterFreq => self.lower_filter_freq.into(),
            Field::HigherFilterFreq => self.higher_filter_freq.into(),
        }
    }

    /// Store a value that has already passed [`safety::validate`].
    fn set(&mut self, field: Field, value: i64) -> Result<(), ValidationError> {
        match field {
            Field::Time => self.time = safety::narrow(field, value)?,
            Field::Gain => self.gain = safety::narrow(field, value)?,
            Field::ClockDivider => self.clock_divider = safety::narrow(field, value)?,
            Field::AcquisitionCycles => self.acquisition_cycles = safety::narrow(field, value)?,
            Field::OversampleRate => self.oversample_rate = safety::narrow(field, value)?,
            Field::SampleRate => self.sample_rate = safety::narrow(field, value)?,
            Field::SampleRateDivider => self.sample_rate_divider = safety::narrow(field, value)?,
            Field::LowerFilterFreq => self.lower_filter_freq = safety::narrow(field, value)?,
            Field::HigherFilterFreq => self.higher_filter_freq = safety::narrow(field, value)?,
        }
        Ok(())
    }
}

impl fmt::Display for ConfigurationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in Field::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{:<20} {}", field.name(), self.get(*field))?;
            if let Some(unit) = field.unit() {
                write!(f, " {unit}")?;
            }
        }
        Ok(())
    }
}

/// Closed set of configuration fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Time,
    Gain,
    ClockDivider,
    AcquisitionCycles,
    OversampleRate,
    SampleRate,
    SampleRateDivider,
    LowerFilterFreq,
    HigherFilterFreq,
}

impl Field {
    pub const COUNT: usize = 9;

    /// All fields in wire order.
    pub const ALL: [Field; Field::COUNT] = [
        Field::Time,
        Field::Gain,
        Field::ClockDivider,
        Field::AcquisitionCycles,
        Field::OversampleRate,
        Field::SampleRate,
        Field::SampleRateDivider,
        Field::LowerFilterFreq,
        Field::HigherFilterFreq,
    ];

    /// Position in wire order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Gain => "gain",
            Self::ClockDivider => "clock_divider",
            Self::AcquisitionCycles => "acquisition_cycles",
            Self::OversampleRate => "oversample_rate",
            Self::SampleRate => "sample_rate",
            Self::SampleRateDivider => "sample_rate_divider",
            Self::LowerFilterFreq => "lower_filter_freq",
            Self::HigherFilterFreq => "higher_filter_freq",
        }
    }

    /// Width of the field on the wire, in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Time | Self::SampleRate => 4,
            Self::LowerFilterFreq | Self::HigherFilterFreq => 2,
            _ => 1,
        }
    }

    pub(crate) fn unit(self) -> Option<&'static str> {
        match self {
            Self::Time => Some("s"),
            Self::SampleRate | Self::LowerFilterFreq | Self::HigherFilterFreq => Some("Hz"),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested changes to a configuration, one optional value per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    values: [Option<i64>; Field::COUNT],
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Overrides::set`].
    pub fn with(mut self, field: Field, value: i64) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: i64) {
        self.values[field.index()] = Some(value);
    }

    /// Set a field from text. Non-integer text is a type mismatch.
    pub fn set_str(&mut self, field: Field, text: &str) -> Result<(), ValidationError> {
        let value = text
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::TypeMismatch {
                field,
                ty: safety::wire_type_name(field),
                value: text.to_string(),
            })?;
        self.set(field, value);
        Ok(())
    }

    pub fn get(&self, field: Field) -> Option<i64> {
        self.values[field.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Present overrides, in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, i64)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f, v)))
    }

    /// Validate every override against `base`, then apply them all.
    ///
    /// Filter frequencies are checked against the requested sample rate when
    /// one is part of this set, otherwise against `base`'s. Nothing is
    /// applied unless every override is valid.
    pub fn merge_into(
        &self,
        base: &ConfigurationRecord,
    ) -> Result<ConfigurationRecord, ValidationError> {
        let effective_sample_rate = match self.get(Field::SampleRate) {
            Some(requested) => {
                safety::validate(Field::SampleRate, requested, base.sample_rate)?;
                safety::narrow(Field::SampleRate, requested)?
            }
            None => base.sample_rate,
        };

        for (field, value) in self.iter() {
            safety::validate(field, value, effective_sample_rate)?;
        }

        let mut merged = *base;
        for (field, value) in self.iter() {
            merged.set(field, value)?;
        }
        Ok(merged)
    }
}
