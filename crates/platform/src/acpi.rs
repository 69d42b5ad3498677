//! Decoding of the ACPI battery structures returned by `/dev/acpi` on
//! FreeBSD and DragonFly (`struct acpi_bif` and `struct acpi_bst`).

use crate::battery::Reading;
use crate::error::{FatalError, Field, FieldError};
use crate::raw::{classify, milli_to_unit, RawBattery, UNKNOWN_CAPACITY};

/// `acpi_bif.units` value for capacities reported in mWh.
pub const UNITS_MILLIWATTS: u32 = 0;

/// The kernel has no enumeration call, so units are tried in order until one
/// is missing. This bounds the scan.
pub const MAX_UNITS: usize = 64;

/// Reads units in order with `read_unit`, which returns `Ok(None)` for a
/// missing unit.
///
/// Stops at the first missing unit. A unit that fails keeps its slot and also
/// ends the scan, since units past it cannot be told apart from missing ones.
pub fn scan_units<F>(mut read_unit: F) -> Vec<Result<Reading, FatalError>>
where
    F: FnMut(usize) -> Result<Option<Reading>, FatalError>,
{
    let mut readings = Vec::new();
    for unit in 0..MAX_UNITS {
        match read_unit(unit) {
            Ok(Some(reading)) => readings.push(Ok(reading)),
            Ok(None) => break,
            Err(err) => {
                readings.push(Err(err));
                break;
            }
        }
    }
    readings
}

/// Static battery information (`_BIF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryInfo {
    pub units: u32,
    pub design_capacity: u32,
    pub last_full_capacity: u32,
    pub technology: u32,
    pub design_voltage: u32,
}

/// Dynamic battery status (`_BST`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub state: u32,
    pub rate: u32,
    pub capacity: u32,
    pub voltage: u32,
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes(bytes.try_into().ok()?))
}

/// Decodes the leading fields of `struct acpi_bif`.
pub fn decode_bif(buf: &[u8]) -> Option<BatteryInfo> {
    Some(BatteryInfo {
        units: read_u32(buf, 0)?,
        design_capacity: read_u32(buf, 4)?,
        last_full_capacity: read_u32(buf, 8)?,
        technology: read_u32(buf, 12)?,
        design_voltage: read_u32(buf, 16)?,
    })
}

/// Decodes `struct acpi_bst`.
pub fn decode_bst(buf: &[u8]) -> Option<BatteryStatus> {
    Some(BatteryStatus {
        state: read_u32(buf, 0)?,
        rate: read_u32(buf, 4)?,
        capacity: read_u32(buf, 8)?,
        voltage: read_u32(buf, 12)?,
    })
}

/// Combines `_BIF` and `_BST` into raw values.
///
/// A failed status query fails the fields it would have provided; the
/// static information is still used.
pub fn raw_battery(info: &BatteryInfo, status: Result<BatteryStatus, FieldError>) -> RawBattery {
    let mut raw = RawBattery {
        design: classify(info.design_capacity, UNKNOWN_CAPACITY),
        full: classify(info.last_full_capacity, UNKNOWN_CAPACITY),
        design_voltage: classify(info.design_voltage, UNKNOWN_CAPACITY).map(milli_to_unit),
        amps: info.units != UNITS_MILLIWATTS,
        ..RawBattery::default()
    };

    match status {
        Ok(bst) => {
            raw.rate = classify(bst.rate, UNKNOWN_CAPACITY);
            raw.current = classify(bst.capacity, UNKNOWN_CAPACITY);
            raw.voltage = classify(bst.voltage, UNKNOWN_CAPACITY).map(milli_to_unit);
            raw.state_flags = Some(Ok(bst.state));
        }
        Err(err) => {
            for field in [Field::State, Field::ChargeRate, Field::Current, Field::Voltage] {
                raw.fail(field, err.clone());
            }
        }
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::State;

    fn encode(values: &[u32]) -> Vec<u8> {
        let mut buf: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        buf.resize(164, 0);
        buf
    }

    fn unit(
        present: &[bool],
        failing: usize,
    ) -> impl FnMut(usize) -> Result<Option<Reading>, FatalError> + '_ {
        move |idx| {
            if idx == failing {
                return Err(FatalError::new("ioctl failed"));
            }
            Ok(present
                .get(idx)
                .filter(|p| **p)
                .map(|_| Reading::new(format!("BAT{}", idx))))
        }
    }

    #[test]
    fn test_scan_stops_at_missing_unit() {
        let readings = scan_units(unit(&[true, true, false, true], usize::MAX));
        assert_eq!(readings.len(), 2);
    }

    #[test]
    fn test_scan_keeps_failed_unit_and_stops() {
        let readings = scan_units(unit(&[true, true, true, true], 1));
        assert_eq!(readings.len(), 2);
        assert!(readings[0].is_ok());
        assert!(readings[1].is_err());
    }

    #[test]
    fn test_scan_is_bounded() {
        let readings = scan_units(|idx| Ok(Some(Reading::new(format!("BAT{}", idx)))));
        assert_eq!(readings.len(), MAX_UNITS);
    }

    #[test]
    fn test_decode_bif() {
        let info = decode_bif(&encode(&[1, 4400, 4000, 1, 10800])).unwrap();
        assert_eq!(
            info,
            BatteryInfo {
                units: 1,
                design_capacity: 4400,
                last_full_capacity: 4000,
                technology: 1,
                design_voltage: 10800,
            }
        );
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(decode_bst(&[0u8; 12]), None);
        assert_eq!(decode_bif(&[0u8; 19]), None);
    }

    #[test]
    fn test_raw_battery_milliwatts() {
        let info = decode_bif(&encode(&[0, 57000, 50000, 1, 11400])).unwrap();
        let status = decode_bst(&encode(&[2, 20000, 25000, 12300])).unwrap();

        let reading = raw_battery(&info, Ok(status)).into_reading("BAT0");
        assert!(reading.errors.all_nil());
        assert_eq!(reading.battery.state, State::Charging);
        assert_eq!(reading.battery.design, 57000.0);
        assert_eq!(reading.battery.current, 25000.0);
        assert_eq!(reading.battery.charge_rate, 20000.0);
    }

    #[test]
    fn test_raw_battery_unknown_rate() {
        let info = decode_bif(&encode(&[0, 57000, 50000, 1, 11400])).unwrap();
        let status = decode_bst(&encode(&[1, UNKNOWN_CAPACITY, 25000, 12300])).unwrap();

        let reading = raw_battery(&info, Ok(status)).into_reading("BAT0");
        let failed: Vec<_> = reading.errors.failed_fields().map(|(f, _)| f).collect();
        assert_eq!(failed, vec![Field::ChargeRate]);
    }

    #[test]
    fn test_raw_battery_status_failure() {
        let info = decode_bif(&encode(&[1, 4400, 4000, 1, 10800])).unwrap();
        let status = Err(FieldError::Malformed("ioctl".into()));
        let reading = raw_battery(&info, status).into_reading("BAT0");

        assert!(reading.errors.state.is_some());
        assert!(reading.errors.current.is_some());
        assert!(reading.errors.voltage.is_some());
        // Design capacity only needs the design voltage.
        assert!(reading.errors.design.is_none());
        assert_eq!(reading.battery.design, 4400.0 * 10.8);
        assert!(matches!(
            reading.errors.full,
            Some(FieldError::Derived {
                from: Field::Voltage,
                ..
            })
        ));
    }
}
