//! macOS support via `ioreg`.
//!
//! `ioreg -n AppleSmartBattery -r -a` prints the registry entries of every
//! smart battery as an XML property list array.

use std::process::Command;

use serde::Deserialize;

use crate::battery::{BatterySource, Reading};
use crate::error::{FatalError, FieldError};
use crate::raw::{milli_to_unit, RawBattery};
use crate::types::State;

const IOREG_ARGS: [&str; 4] = ["-n", "AppleSmartBattery", "-r", "-a"];

#[derive(Debug, Clone, Copy, Default)]
pub struct IoregSource;

impl IoregSource {
    fn output(&self) -> Result<Vec<u8>, FatalError> {
        let output = Command::new("ioreg").args(IOREG_ARGS).output()?;
        if !output.status.success() {
            return Err(FatalError::new(format!(
                "ioreg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl BatterySource for IoregSource {
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError> {
        let output = self.output()?;
        Ok(parse_ioreg(&output)?.into_iter().map(Ok).collect())
    }
}

/// The subset of `AppleSmartBattery` properties used here.
///
/// Capacities are in mAh and voltage in mV. On recent hardware
/// `CurrentCapacity`/`MaxCapacity` are percentages, so the `AppleRaw*`
/// variants are preferred when present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IoregBattery {
    pub device_name: Option<String>,
    pub current_capacity: Option<u64>,
    pub max_capacity: Option<u64>,
    pub design_capacity: Option<u64>,
    pub apple_raw_current_capacity: Option<u64>,
    pub apple_raw_max_capacity: Option<u64>,
    pub amperage: Option<plist::Integer>,
    pub voltage: Option<u64>,
    pub fully_charged: Option<bool>,
    pub is_charging: Option<bool>,
    pub external_connected: Option<bool>,
}

/// Parses `ioreg -a` output into one reading per battery.
pub fn parse_ioreg(output: &[u8]) -> Result<Vec<Reading>, FatalError> {
    let batteries: Vec<IoregBattery> = plist::from_bytes(output).map_err(FatalError::new)?;
    Ok(batteries
        .iter()
        .enumerate()
        .map(|(idx, battery)| battery.to_reading(idx))
        .collect())
}

fn value(v: Option<u64>) -> Result<f64, FieldError> {
    v.map(|v| v as f64).ok_or(FieldError::Missing)
}

impl IoregBattery {
    /// Signed battery current in mA.
    ///
    /// `ioreg` prints negative currents as their unsigned 64-bit pattern.
    fn amperage(&self) -> Option<i64> {
        let amperage = self.amperage.as_ref()?;
        amperage
            .as_signed()
            .or_else(|| amperage.as_unsigned().map(|v| v as i64))
    }

    fn state(&self, current: &Result<f64, FieldError>) -> Result<State, FieldError> {
        match (self.external_connected, self.is_charging) {
            (None, None) => Err(FieldError::Missing),
            (Some(false), _) => Ok(State::Discharging),
            (_, Some(true)) => Ok(State::Charging),
            _ if matches!(current, Ok(c) if *c == 0.0) => Ok(State::Empty),
            _ if self.fully_charged == Some(true) => Ok(State::Full),
            _ => Ok(State::Idle),
        }
    }

    pub fn to_reading(&self, idx: usize) -> Reading {
        let current = value(self.apple_raw_current_capacity.or(self.current_capacity));
        let raw = RawBattery {
            design: value(self.design_capacity),
            full: value(self.apple_raw_max_capacity.or(self.max_capacity)),
            rate: self.amperage().map(|a| a as f64).ok_or(FieldError::Missing),
            voltage: value(self.voltage).map(milli_to_unit),
            state: self.state(&current),
            current,
            amps: true,
            ..RawBattery::default()
        };

        let name = self
            .device_name
            .clone()
            .unwrap_or_else(|| format!("BAT{}", idx));
        raw.into_reading(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Field;

    const DISCHARGING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<array>
	<dict>
		<key>AppleRawCurrentCapacity</key>
		<integer>3000</integer>
		<key>AppleRawMaxCapacity</key>
		<integer>4000</integer>
		<key>Amperage</key>
		<integer>18446744073709550616</integer>
		<key>CurrentCapacity</key>
		<integer>75</integer>
		<key>DesignCapacity</key>
		<integer>5000</integer>
		<key>DeviceName</key>
		<string>bq40z651</string>
		<key>ExternalConnected</key>
		<false/>
		<key>FullyCharged</key>
		<false/>
		<key>IsCharging</key>
		<false/>
		<key>MaxCapacity</key>
		<integer>100</integer>
		<key>Voltage</key>
		<integer>12000</integer>
	</dict>
</array>
</plist>
"#;

    fn battery() -> IoregBattery {
        IoregBattery {
            current_capacity: Some(2000),
            max_capacity: Some(4000),
            design_capacity: Some(5000),
            voltage: Some(12000),
            amperage: Some(plist::Integer::from(0i64)),
            external_connected: Some(true),
            is_charging: Some(false),
            fully_charged: Some(false),
            ..IoregBattery::default()
        }
    }

    #[test]
    fn test_parses_plist() {
        let readings = parse_ioreg(DISCHARGING.as_bytes()).unwrap();
        assert_eq!(readings.len(), 1);

        let reading = &readings[0];
        assert!(reading.errors.all_nil(), "{}", reading.errors);
        assert_eq!(reading.battery.name, "bq40z651");
        assert_eq!(reading.battery.state, State::Discharging);
        assert_eq!(reading.battery.current, 36_000.0);
        assert_eq!(reading.battery.full, 48_000.0);
        assert_eq!(reading.battery.design, 60_000.0);
        assert_eq!(reading.battery.charge_rate, 12_000.0);
        assert_eq!(reading.battery.voltage, 12.0);
    }

    #[test]
    fn test_invalid_plist_is_fatal() {
        assert!(parse_ioreg(b"not a plist").is_err());
    }

    #[test]
    fn test_state_rules() {
        let mut b = battery();
        assert_eq!(b.to_reading(0).battery.state, State::Idle);

        b.fully_charged = Some(true);
        assert_eq!(b.to_reading(0).battery.state, State::Full);

        b.current_capacity = Some(0);
        assert_eq!(b.to_reading(0).battery.state, State::Empty);

        b.is_charging = Some(true);
        assert_eq!(b.to_reading(0).battery.state, State::Charging);

        b.external_connected = Some(false);
        assert_eq!(b.to_reading(0).battery.state, State::Discharging);
    }

    #[test]
    fn test_missing_properties_are_partial() {
        let b = IoregBattery {
            external_connected: None,
            is_charging: None,
            amperage: None,
            ..battery()
        };
        let reading = b.to_reading(1);
        assert_eq!(reading.battery.name, "BAT1");
        let failed: Vec<_> = reading.errors.failed_fields().map(|(f, _)| f).collect();
        assert_eq!(failed, vec![Field::State, Field::ChargeRate]);
    }
}
