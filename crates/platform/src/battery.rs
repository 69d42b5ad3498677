//! Battery record and the source trait every backend implements.

use std::time::Duration;

use serde::Serialize;

use crate::error::{
    AllFieldsFailed, BatchError, Error, Errors, FatalError, Field, FieldError, PartialError,
    SlotError,
};
use crate::types::State;

/// Battery snapshot at the time of the query.
///
/// Capacities are in milliwatt-hours, the charge rate in milliwatts and
/// voltages in volts. A field whose slot in the accompanying [`PartialError`]
/// is set holds `0.0` and must not be used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Battery {
    /// Source-specific identity, e.g. `BAT0`.
    pub name: String,

    /// Current power state.
    pub state: State,

    /// State text as reported by the OS, when there was one.
    pub state_raw: Option<String>,

    /// Energy currently stored, in mWh.
    pub current: f64,

    /// Energy stored when fully charged (last full capacity), in mWh.
    pub full: f64,

    /// Factory design capacity, in mWh.
    pub design: f64,

    /// Magnitude of the charge or discharge rate, in mW. The direction is
    /// given by `state`.
    pub charge_rate: f64,

    /// Present voltage, in V.
    pub voltage: f64,

    /// Design voltage, in V.
    pub design_voltage: f64,
}

impl Battery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn value_mut(&mut self, field: Field) -> Option<&mut f64> {
        match field {
            Field::State => None,
            Field::Current => Some(&mut self.current),
            Field::Full => Some(&mut self.full),
            Field::Design => Some(&mut self.design),
            Field::ChargeRate => Some(&mut self.charge_rate),
            Field::Voltage => Some(&mut self.voltage),
            Field::DesignVoltage => Some(&mut self.design_voltage),
        }
    }

    /// Charge level as a percentage of the last full capacity.
    pub fn charge_percent(&self) -> Option<f64> {
        (self.full > 0.0).then(|| (self.current / self.full * 100.0).min(100.0))
    }

    /// Last full capacity as a percentage of the design capacity.
    pub fn health_percent(&self) -> Option<f64> {
        (self.design > 0.0).then(|| self.full / self.design * 100.0)
    }

    /// Estimated time until empty, if discharging at a non-zero rate.
    pub fn time_to_empty(&self) -> Option<Duration> {
        if self.state != State::Discharging {
            return None;
        }
        hours_to_duration(self.current / self.charge_rate)
    }

    /// Estimated time until full, if charging at a non-zero rate.
    pub fn time_to_full(&self) -> Option<Duration> {
        if self.state != State::Charging {
            return None;
        }
        hours_to_duration((self.full - self.current).max(0.0) / self.charge_rate)
    }

    /// Get the time remaining (to full or empty depending on state).
    pub fn time_remaining(&self) -> Option<Duration> {
        match self.state {
            State::Charging => self.time_to_full(),
            State::Discharging => self.time_to_empty(),
            _ => None,
        }
    }
}

fn hours_to_duration(hours: f64) -> Option<Duration> {
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(hours * 3600.0))
}

/// A battery as read by a backend, before the escalation rules are applied.
#[derive(Debug, Clone, Default)]
pub struct Reading {
    pub battery: Battery,
    pub errors: PartialError,
}

impl Reading {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            battery: Battery::new(name),
            errors: PartialError::default(),
        }
    }

    /// Stores a numeric field read, or the reason it failed.
    pub fn record(&mut self, field: Field, value: Result<f64, FieldError>) {
        match value {
            Ok(v) => {
                if let Some(slot) = self.battery.value_mut(field) {
                    *slot = v;
                }
                self.errors.set(field, None);
            }
            Err(err) => {
                tracing::trace!(battery = %self.battery.name, %field, error = %err, "field unavailable");
                if let Some(slot) = self.battery.value_mut(field) {
                    *slot = 0.0;
                }
                self.errors.set(field, Some(err));
            }
        }
    }

    /// Stores the state read, or the reason it failed.
    pub fn record_state(&mut self, state: Result<State, FieldError>) {
        match state {
            Ok(state) => {
                self.battery.state = state;
                self.errors.state = None;
            }
            Err(err) => {
                tracing::trace!(battery = %self.battery.name, error = %err, "state unavailable");
                self.battery.state = State::default();
                self.errors.state = Some(err);
            }
        }
    }

    /// Stores an OS status string, keeping the raw text.
    ///
    /// Unrecognized text still sets the state (to [`State::Undefined`]) and
    /// records why in the state slot.
    pub fn record_state_text(&mut self, text: &str) {
        let (state, err) = State::parse(text);
        self.battery.state = state;
        self.battery.state_raw = Some(text.to_string());
        self.errors.state = err;
    }

    /// Applies the escalation rules for a single-battery query.
    ///
    /// No failed field yields the battery, every field failed yields a fatal
    /// error, anything in between a partial error carrying the battery.
    pub fn finish(self) -> Result<Battery, Error> {
        if self.errors.all_nil() {
            Ok(self.battery)
        } else if self.errors.all_failed() {
            Err(Error::Fatal(FatalError::new(AllFieldsFailed(self.errors))))
        } else {
            Err(Error::Partial {
                battery: Box::new(self.battery),
                errors: self.errors,
            })
        }
    }

    /// Same rules as [`Reading::finish`], shaped as a batch slot.
    fn into_slot(self) -> (Option<Battery>, Option<SlotError>) {
        if self.errors.all_nil() {
            (Some(self.battery), None)
        } else if self.errors.all_failed() {
            let fatal = FatalError::new(AllFieldsFailed(self.errors));
            (None, Some(SlotError::Fatal(fatal)))
        } else {
            (Some(self.battery), Some(SlotError::Partial(self.errors)))
        }
    }
}

/// A platform-specific way of reading batteries.
///
/// Implementors only acquire raw data; [`BatterySource::query_one`] and
/// [`BatterySource::query_all`] apply the shared error rules on top.
pub trait BatterySource {
    /// Reads every battery in enumeration order.
    ///
    /// The outer error means enumeration itself failed. An inner error keeps
    /// the slot of a battery that could not be read at all.
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError>;

    /// Reads the battery at `idx` in enumeration order, `None` if there is
    /// no such battery.
    fn read(&self, idx: usize) -> Result<Option<Reading>, FatalError> {
        match self.read_all()?.into_iter().nth(idx) {
            Some(reading) => reading.map(Some),
            None => Ok(None),
        }
    }

    /// Queries one battery by index.
    fn query_one(&self, idx: usize) -> Result<Battery, Error> {
        match self.read(idx)? {
            Some(reading) => reading.finish(),
            None => {
                tracing::debug!(idx, "battery not found");
                Err(Error::NotFound)
            }
        }
    }

    /// Queries every battery.
    ///
    /// Returns the plain records unless some slot failed, in which case the
    /// records and their index-aligned errors are returned together.
    fn query_all(&self) -> Result<Vec<Battery>, BatchError> {
        let readings = self.read_all()?;

        let mut batteries = Vec::with_capacity(readings.len());
        let mut errors = Errors::with_capacity(readings.len());
        for reading in readings {
            let (battery, error) = match reading {
                Ok(reading) => reading.into_slot(),
                Err(fatal) => (None, Some(SlotError::Fatal(fatal))),
            };
            batteries.push(battery);
            errors.push(error);
        }

        if !errors.has_failure() {
            tracing::debug!(count = batteries.len(), "read all batteries");
            return Ok(batteries.into_iter().flatten().collect());
        }

        tracing::debug!(count = batteries.len(), "battery batch had failures");
        Err(BatchError::Failed { batteries, errors })
    }
}
