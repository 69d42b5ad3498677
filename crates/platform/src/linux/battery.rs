use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::battery::{BatterySource, Reading};
use crate::error::{FatalError, Field, FieldError};
use crate::raw::{amp_to_watt, micro_to_milli, parse_number};

const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

/// Reads batteries from the `power_supply` class in sysfs.
///
/// Batteries are the entries whose `type` attribute is `Battery`, in name
/// order. Energy and power attributes are preferred; drivers that only expose
/// charge and current are converted using the reported voltage.
#[derive(Debug, Clone)]
pub struct SysfsSource {
    root: PathBuf,
}

impl Default for SysfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsSource {
    pub fn new() -> Self {
        Self::with_root(POWER_SUPPLY_PATH)
    }

    /// Uses `root` in place of `/sys/class/power_supply`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_supported() -> bool {
        Path::new(POWER_SUPPLY_PATH).exists()
    }

    /// Battery directories in enumeration order.
    ///
    /// An entry whose type cannot be read keeps its slot as a fatal error.
    fn batteries(&self) -> Result<Vec<Result<PathBuf, FatalError>>, FatalError> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            tracing::debug!(root = %self.root.display(), error = %e, "cannot enumerate power supplies");
            FatalError::new(e)
        })?;

        let mut paths: Vec<PathBuf> = readable_entries(entries, &self.root)
            .map(|entry| entry.path())
            .collect();
        paths.sort();

        let mut batteries = Vec::new();
        for path in paths {
            match fs::read_to_string(path.join("type")) {
                Ok(kind) if kind.trim() == "Battery" => batteries.push(Ok(path)),
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "unreadable power supply type");
                    batteries.push(Err(FatalError::new(e)));
                }
            }
        }
        tracing::debug!(count = batteries.len(), "found sysfs batteries");
        Ok(batteries)
    }
}

/// Skips directory entries that cannot be read. Their type is unknown, so
/// they do not take a battery slot.
fn readable_entries<'a, T>(
    entries: impl Iterator<Item = io::Result<T>> + 'a,
    root: &'a Path,
) -> impl Iterator<Item = T> + 'a {
    entries.filter_map(move |entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "skipping unreadable power supply entry");
            None
        }
    })
}

impl BatterySource for SysfsSource {
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError> {
        Ok(self
            .batteries()?
            .into_iter()
            .map(|battery| battery.map(|path| read_battery(&path)))
            .collect())
    }

    fn read(&self, idx: usize) -> Result<Option<Reading>, FatalError> {
        match self.batteries()?.into_iter().nth(idx) {
            Some(battery) => battery.map(|path| Some(read_battery(&path))),
            None => Ok(None),
        }
    }
}

fn read_battery(path: &Path) -> Reading {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut reading = Reading::new(name);

    match fs::read_to_string(path.join("status")) {
        Ok(status) => reading.record_state_text(status.trim()),
        Err(e) => reading.record_state(Err(e.into())),
    }

    let voltage = read_attr(path, "voltage_now").map(|uv| uv / 1_000_000.0);
    let design_voltage = match read_attr(path, "voltage_min_design") {
        Ok(uv) => Ok(uv / 1_000_000.0),
        Err(_) if voltage.is_ok() => voltage.clone(),
        Err(e) => Err(e),
    };

    reading.record(
        Field::Current,
        energy(path, "energy_now", "charge_now", &voltage, Field::Voltage),
    );
    reading.record(
        Field::Full,
        energy(path, "energy_full", "charge_full", &voltage, Field::Voltage),
    );
    reading.record(
        Field::Design,
        energy(
            path,
            "energy_full_design",
            "charge_full_design",
            &design_voltage,
            Field::DesignVoltage,
        ),
    );
    reading.record(
        Field::ChargeRate,
        energy(path, "power_now", "current_now", &voltage, Field::Voltage).map(f64::abs),
    );
    reading.record(Field::Voltage, voltage);
    reading.record(Field::DesignVoltage, design_voltage);

    reading
}

fn read_attr(path: &Path, attr: &str) -> Result<f64, FieldError> {
    let content = fs::read_to_string(path.join(attr))?;
    parse_number(&content)
}

/// Reads a µW(h) attribute as mW(h), falling back to the µA(h) attribute
/// multiplied by `voltage` when the driver does not report energy.
fn energy(
    path: &Path,
    energy_attr: &str,
    charge_attr: &str,
    voltage: &Result<f64, FieldError>,
    voltage_field: Field,
) -> Result<f64, FieldError> {
    match read_attr(path, energy_attr) {
        Err(FieldError::Missing) => {
            let charge = read_attr(path, charge_attr).map(micro_to_milli);
            amp_to_watt(charge, voltage, voltage_field)
        }
        other => other.map(micro_to_milli),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::State;
    use tempfile::TempDir;

    fn supply(root: &Path, name: &str, attrs: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{}\n", value)).unwrap();
        }
    }

    fn energy_battery(root: &Path, name: &str) {
        supply(
            root,
            name,
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("energy_now", "30000000"),
                ("energy_full", "50000000"),
                ("energy_full_design", "57000000"),
                ("power_now", "9500000"),
                ("voltage_now", "11800000"),
                ("voltage_min_design", "11400000"),
            ],
        );
    }

    #[test]
    fn test_reads_energy_battery() {
        let td = TempDir::new().unwrap();
        energy_battery(td.path(), "BAT0");

        let battery = SysfsSource::with_root(td.path()).query_one(0).unwrap();
        assert_eq!(battery.name, "BAT0");
        assert_eq!(battery.state, State::Discharging);
        assert_eq!(battery.state_raw.as_deref(), Some("Discharging"));
        assert_eq!(battery.current, 30_000.0);
        assert_eq!(battery.full, 50_000.0);
        assert_eq!(battery.design, 57_000.0);
        assert_eq!(battery.charge_rate, 9_500.0);
        assert!((battery.voltage - 11.8).abs() < 1e-9);
        assert!((battery.design_voltage - 11.4).abs() < 1e-9);
    }

    #[test]
    fn test_converts_charge_battery() {
        let td = TempDir::new().unwrap();
        supply(
            td.path(),
            "BAT1",
            &[
                ("type", "Battery"),
                ("status", "Charging"),
                ("charge_now", "2000000"),
                ("charge_full", "4000000"),
                ("charge_full_design", "5000000"),
                ("current_now", "-1000000"),
                ("voltage_now", "12000000"),
                ("voltage_min_design", "10000000"),
            ],
        );

        let battery = SysfsSource::with_root(td.path()).query_one(0).unwrap();
        assert_eq!(battery.current, 24_000.0);
        assert_eq!(battery.full, 48_000.0);
        assert_eq!(battery.design, 50_000.0);
        assert_eq!(battery.charge_rate, 12_000.0);
    }

    #[test]
    fn test_skips_non_batteries() {
        let td = TempDir::new().unwrap();
        supply(td.path(), "AC", &[("type", "Mains"), ("online", "1")]);
        energy_battery(td.path(), "BAT0");

        let batteries = SysfsSource::with_root(td.path()).query_all().unwrap();
        assert_eq!(batteries.len(), 1);
        assert_eq!(batteries[0].name, "BAT0");
    }

    #[test]
    fn test_missing_design_voltage_uses_voltage() {
        let td = TempDir::new().unwrap();
        supply(
            td.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Full"),
                ("energy_now", "50000000"),
                ("energy_full", "50000000"),
                ("energy_full_design", "57000000"),
                ("power_now", "0"),
                ("voltage_now", "12000000"),
            ],
        );

        let battery = SysfsSource::with_root(td.path()).query_one(0).unwrap();
        assert_eq!(battery.design_voltage, 12.0);
        assert_eq!(battery.charge_rate, 0.0);
    }

    #[test]
    fn test_missing_rate_is_partial() {
        let td = TempDir::new().unwrap();
        supply(
            td.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("energy_now", "30000000"),
                ("energy_full", "50000000"),
                ("energy_full_design", "57000000"),
                ("voltage_now", "11800000"),
                ("voltage_min_design", "11400000"),
            ],
        );

        match SysfsSource::with_root(td.path()).query_one(0) {
            Err(Error::Partial { battery, errors }) => {
                assert_eq!(battery.current, 30_000.0);
                assert!(errors.charge_rate.is_some());
                assert_eq!(errors.describe().lines().count(), 1);
            }
            other => panic!("expected partial error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_attribute_is_partial() {
        let td = TempDir::new().unwrap();
        energy_battery(td.path(), "BAT0");
        fs::write(td.path().join("BAT0/energy_full"), "garbage\n").unwrap();

        let err = SysfsSource::with_root(td.path()).query_one(0).unwrap_err();
        match err {
            Error::Partial { errors, .. } => {
                assert!(matches!(errors.full, Some(FieldError::Parse { .. })));
            }
            other => panic!("expected partial error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_battery_directory_is_fatal() {
        let td = TempDir::new().unwrap();
        supply(td.path(), "BAT0", &[("type", "Battery")]);

        assert!(matches!(
            SysfsSource::with_root(td.path()).query_one(0),
            Err(Error::Fatal(_))
        ));
    }

    #[test]
    fn test_index_out_of_range_is_not_found() {
        let td = TempDir::new().unwrap();
        energy_battery(td.path(), "BAT0");

        assert!(matches!(
            SysfsSource::with_root(td.path()).query_one(3),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_unreadable_entries_are_skipped() {
        let entries = vec![
            Ok("AC"),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok("BAT0"),
        ];
        let kept: Vec<_> = readable_entries(entries.into_iter(), Path::new("/sys")).collect();
        assert_eq!(kept, vec!["AC", "BAT0"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let td = TempDir::new().unwrap();
        let source = SysfsSource::with_root(td.path().join("nope"));
        assert!(matches!(source.query_one(0), Err(Error::Fatal(_))));
        assert!(matches!(
            source.query_all(),
            Err(crate::error::BatchError::Fatal(_))
        ));
    }
}
