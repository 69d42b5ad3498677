//! Classification and conversion of raw values read from the OS.
//!
//! Native APIs mark unavailable values with magic numbers. Every backend runs
//! its raw values through [`classify`] so such markers become a
//! [`FieldError::Sentinel`] instead of a plausible-looking zero.

use crate::battery::Reading;
use crate::error::{Field, FieldError};
use crate::types::State;

/// ACPI "unknown capacity/rate" marker (`0xFFFFFFFF`).
pub const UNKNOWN_CAPACITY: u32 = 0xFFFF_FFFF;

/// Converts a raw value, rejecting the source's sentinel.
pub fn classify<T>(value: T, sentinel: T) -> Result<f64, FieldError>
where
    T: Copy + PartialEq + Into<f64>,
{
    if value == sentinel {
        Err(FieldError::Sentinel)
    } else {
        Ok(value.into())
    }
}

/// Rejects NaN and infinities coming from floating point sources.
pub fn finite(value: f64) -> Result<f64, FieldError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FieldError::Sentinel)
    }
}

/// Parses a decimal number from text such as a sysfs attribute.
pub fn parse_number(text: &str) -> Result<f64, FieldError> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|e| FieldError::parse(trimmed, e))?;
    if !value.is_finite() {
        return Err(FieldError::parse(trimmed, "not a finite number"));
    }
    Ok(value)
}

pub fn micro_to_milli(value: f64) -> f64 {
    value / 1000.0
}

pub fn milli_to_unit(value: f64) -> f64 {
    value / 1000.0
}

/// Multiplies an amp-based value by a voltage to get the watt-based value.
///
/// The value's own failure wins; otherwise a failed voltage is recorded as
/// the reason this value is unavailable.
pub fn amp_to_watt(
    value: Result<f64, FieldError>,
    voltage: &Result<f64, FieldError>,
    voltage_field: Field,
) -> Result<f64, FieldError> {
    let value = value?;
    match voltage {
        Ok(volts) => Ok(value * volts),
        Err(err) => Err(FieldError::derived(voltage_field, err.clone())),
    }
}

/// Raw ACPI-style battery values, as exposed by `_BIF`/`_BST` and the OS
/// interfaces built on them.
///
/// Capacities and rate are in mWh/mW, or mAh/mA when `amps` is set. Voltages
/// are in volts. Every slot starts out as [`FieldError::Missing`]. When
/// `state_flags` holds ACPI status bits, the state is derived from them once
/// all capacities are known.
#[derive(Debug, Clone)]
pub struct RawBattery {
    pub design: Result<f64, FieldError>,
    pub full: Result<f64, FieldError>,
    pub current: Result<f64, FieldError>,
    pub rate: Result<f64, FieldError>,
    pub voltage: Result<f64, FieldError>,
    pub design_voltage: Result<f64, FieldError>,
    pub state: Result<State, FieldError>,
    pub state_flags: Option<Result<u32, FieldError>>,
    pub amps: bool,
}

impl Default for RawBattery {
    fn default() -> Self {
        Self {
            design: Err(FieldError::Missing),
            full: Err(FieldError::Missing),
            current: Err(FieldError::Missing),
            rate: Err(FieldError::Missing),
            voltage: Err(FieldError::Missing),
            design_voltage: Err(FieldError::Missing),
            state: Err(FieldError::Missing),
            state_flags: None,
            amps: false,
        }
    }
}

impl RawBattery {
    /// Replaces every slot still marked missing with `err`.
    pub fn fail_missing(&mut self, err: &FieldError) {
        let replace = |slot: &mut Result<f64, FieldError>| {
            if matches!(slot, Err(FieldError::Missing)) {
                *slot = Err(err.clone());
            }
        };
        replace(&mut self.design);
        replace(&mut self.full);
        replace(&mut self.current);
        replace(&mut self.rate);
        replace(&mut self.voltage);
        replace(&mut self.design_voltage);
        if matches!(self.state, Err(FieldError::Missing)) {
            self.state = Err(err.clone());
        }
    }

    /// Sets one slot to the same error, e.g. when a whole status query failed.
    pub fn fail(&mut self, field: Field, err: FieldError) {
        match field {
            Field::State => self.state = Err(err),
            Field::Current => self.current = Err(err),
            Field::Full => self.full = Err(err),
            Field::Design => self.design = Err(err),
            Field::ChargeRate => self.rate = Err(err),
            Field::Voltage => self.voltage = Err(err),
            Field::DesignVoltage => self.design_voltage = Err(err),
        }
    }

    /// Whether the remaining capacity has reached the last full capacity.
    ///
    /// Both are in the same unit, so this holds before voltage conversion.
    pub fn at_full_capacity(&self) -> bool {
        matches!((&self.current, &self.full), (Ok(c), Ok(f)) if c >= f)
    }

    /// Sets the state from ACPI status flags.
    pub fn set_acpi_state(&mut self, flags: Result<u32, FieldError>) {
        let at_full = self.at_full_capacity();
        self.state = flags.map(|f| State::from_acpi_flags(f, at_full));
    }

    /// Normalizes to watt-based units and builds the reading.
    pub fn into_reading(self, name: impl Into<String>) -> Reading {
        let mut raw = self;

        if let Some(flags) = raw.state_flags.take() {
            raw.set_acpi_state(flags);
        }

        if raw.design_voltage.is_err() && raw.voltage.is_ok() {
            raw.design_voltage = raw.voltage.clone();
        }

        if raw.amps {
            raw.design = amp_to_watt(raw.design, &raw.design_voltage, Field::DesignVoltage);
            raw.full = amp_to_watt(raw.full, &raw.voltage, Field::Voltage);
            raw.current = amp_to_watt(raw.current, &raw.voltage, Field::Voltage);
            raw.rate = amp_to_watt(raw.rate, &raw.voltage, Field::Voltage);
        }

        let mut reading = Reading::new(name);
        reading.record_state(raw.state);
        reading.record(Field::Current, raw.current);
        reading.record(Field::Full, raw.full);
        reading.record(Field::Design, raw.design);
        reading.record(Field::ChargeRate, raw.rate.map(f64::abs));
        reading.record(Field::Voltage, raw.voltage);
        reading.record(Field::DesignVoltage, raw.design_voltage);
        reading
    }
}
