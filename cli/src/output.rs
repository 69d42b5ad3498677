//! Text and JSON rendering of query results.

use std::time::Duration;

use cellstat_platform::{Battery, Field, PartialError, SlotError, State};
use color_eyre::eyre::Result;
use serde::Serialize;

/// Formats a duration to minute precision, e.g. `3h 12m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs() / 60 * 60;
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

/// Time estimate or zero-rate notice for a (dis)charging battery.
fn estimate(battery: &Battery) -> Option<String> {
    let (label, stalled) = match battery.state {
        State::Discharging => (
            "remaining",
            "discharging at zero rate - will never fully discharge",
        ),
        State::Charging => (
            "until charged",
            "charging at zero rate - will never fully charge",
        ),
        _ => return None,
    };

    if battery.charge_rate == 0.0 {
        return Some(stalled.to_string());
    }
    battery
        .time_remaining()
        .map(|d| format!("{} {}", format_duration(d), label))
}

/// One line per battery. Values whose field failed are left out.
pub fn battery_line(battery: &Battery, errors: Option<&PartialError>) -> String {
    let failed = |field: Field| errors.is_some_and(|e| e.get(field).is_some());

    let mut line = format!("{}: {}", battery.name, battery.state);

    if !failed(Field::Current) && !failed(Field::Full) {
        if let Some(percent) = battery.charge_percent() {
            line.push_str(&format!(", {:.2}%", percent));
        }
    }

    if !failed(Field::Voltage) {
        line.push_str(&format!(" [Voltage: {:.2}V", battery.voltage));
        if !failed(Field::DesignVoltage) {
            line.push_str(&format!(" (design: {:.2}V)", battery.design_voltage));
        }
        line.push(']');
    }

    if !failed(Field::ChargeRate) && !failed(Field::Current) && !failed(Field::Full) {
        if let Some(estimate) = estimate(battery) {
            line.push_str(", ");
            line.push_str(&estimate);
        }
    }

    line
}

pub fn partial_lines(errors: &PartialError) -> Vec<String> {
    errors.describe().lines().map(str::to_owned).collect()
}

pub fn slot_lines(error: &SlotError) -> Vec<String> {
    match error {
        SlotError::Partial(partial) => partial_lines(partial),
        SlotError::Fatal(fatal) => vec![fatal.to_string()],
    }
}

#[derive(Debug, Serialize)]
pub struct Entry<'a> {
    pub index: usize,
    pub battery: Option<&'a Battery>,
    pub charge_percent: Option<f64>,
    pub health_percent: Option<f64>,
    pub time_remaining_secs: Option<u64>,
    pub errors: Vec<String>,
}

impl<'a> Entry<'a> {
    /// Derived values are left out when any field they are computed from
    /// failed, so an unreadable value never shows up as zero.
    pub fn new(
        index: usize,
        battery: Option<&'a Battery>,
        partial: Option<&PartialError>,
        errors: Vec<String>,
    ) -> Self {
        let usable = |fields: &[Field]| {
            let failed = partial.is_some_and(|p| fields.iter().any(|f| p.get(*f).is_some()));
            battery.filter(|_| !failed)
        };

        Self {
            index,
            battery,
            charge_percent: usable(&[Field::Current, Field::Full])
                .and_then(Battery::charge_percent),
            health_percent: usable(&[Field::Full, Field::Design])
                .and_then(Battery::health_percent),
            time_remaining_secs: usable(&[
                Field::State,
                Field::ChargeRate,
                Field::Current,
                Field::Full,
            ])
            .and_then(Battery::time_remaining)
            .map(|d| d.as_secs()),
            errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub timestamp: String,
    pub batteries: Vec<Entry<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(batteries: Vec<Entry<'a>>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            batteries,
        }
    }

    pub fn print(&self, compact: bool) -> Result<()> {
        if compact {
            println!("{}", serde_json::to_string(self)?);
        } else {
            println!("{}", serde_json::to_string_pretty(self)?);
        }
        Ok(())
    }
}
