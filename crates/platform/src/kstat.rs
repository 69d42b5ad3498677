//! illumos/Solaris support via `kstat` output.
//!
//! `kstat -p` prints one `module:instance:name:statistic<TAB>value` line per
//! statistic. The `acpi_drv` module publishes `battery BIF<n>` and
//! `battery BST<n>` kstats for every battery instance.

use std::collections::BTreeMap;
use std::process::Command;

use crate::battery::{BatterySource, Reading};
use crate::error::{FatalError, FieldError};
use crate::raw::{classify, milli_to_unit, RawBattery, UNKNOWN_CAPACITY};

const KSTAT_ARGS: [&str; 5] = ["-p", "-m", "acpi_drv", "-n", "battery B*"];

#[derive(Debug, Clone, Copy, Default)]
pub struct KstatSource;

impl KstatSource {
    fn output(&self) -> Result<String, FatalError> {
        let output = Command::new("kstat").args(KSTAT_ARGS).output()?;
        if !output.status.success() {
            return Err(FatalError::new(format!(
                "kstat exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BatterySource for KstatSource {
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError> {
        let output = self.output()?;
        Ok(parse_kstat(&output).into_iter().map(Ok).collect())
    }
}

#[derive(Debug, Default)]
struct Instance {
    raw: RawBattery,
    malformed: Option<FieldError>,
}

/// Groups `kstat -p` lines by instance and builds one reading per instance,
/// in instance order.
///
/// A malformed line is attributed to the instance of the line before it and
/// marks every value of that instance that was not read.
pub fn parse_kstat(output: &str) -> Vec<Reading> {
    let mut instances: BTreeMap<u32, Instance> = BTreeMap::new();
    let mut last: Option<u32> = None;

    for (lineno, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let malformed =
            |reason: &str| FieldError::Malformed(format!("line {}: {}", lineno + 1, reason));

        let parts: Vec<&str> = line.splitn(4, ':').collect();
        let Some(instance) = parts.get(1).and_then(|i| i.parse::<u32>().ok()) else {
            mark_malformed(&mut instances, last, malformed("missing instance number"));
            continue;
        };
        last = Some(instance);
        let entry = instances.entry(instance).or_default();

        let Some((key, value)) = parts.get(3).and_then(|stat| stat.split_once('\t')) else {
            entry.malformed.get_or_insert(malformed("expected `statistic<TAB>value`"));
            continue;
        };

        apply(&mut entry.raw, key, value.trim());
    }

    instances
        .into_iter()
        .map(|(instance, mut entry)| {
            if let Some(err) = entry.malformed {
                entry.raw.fail_missing(&err);
            }
            entry.raw.into_reading(format!("BAT{}", instance))
        })
        .collect()
}

fn mark_malformed(instances: &mut BTreeMap<u32, Instance>, last: Option<u32>, err: FieldError) {
    match last.and_then(|i| instances.get_mut(&i)) {
        Some(entry) => {
            entry.malformed.get_or_insert(err);
        }
        None => tracing::debug!(error = %err, "dropping unattributed kstat line"),
    }
}

fn read_u32(value: &str) -> Result<u32, FieldError> {
    value.parse::<u32>().map_err(|e| FieldError::parse(value, e))
}

fn read_value(value: &str) -> Result<f64, FieldError> {
    classify(read_u32(value)?, UNKNOWN_CAPACITY)
}

fn apply(raw: &mut RawBattery, key: &str, value: &str) {
    match key {
        "bif_design_cap" => raw.design = read_value(value),
        "bif_last_cap" => raw.full = read_value(value),
        "bif_unit" => raw.amps = value != "0",
        "bif_voltage" => raw.design_voltage = read_value(value).map(milli_to_unit),
        "bst_voltage" => raw.voltage = read_value(value).map(milli_to_unit),
        "bst_rem_cap" => raw.current = read_value(value),
        "bst_rate" => raw.rate = read_value(value),
        "bst_state" => raw.state_flags = Some(read_u32(value)),
        _ => {}
    }
}
