//! Generic backend on top of `starship-battery`, for targets without a
//! native source.

use starship_battery::units::electric_potential::volt;
use starship_battery::units::energy::watt_hour;
use starship_battery::units::power::watt;
use starship_battery::Manager;

use crate::battery::{BatterySource, Reading};
use crate::error::{FatalError, Field};
use crate::raw::finite;
use crate::types::State;

#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerSource;

impl BatterySource for ManagerSource {
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError> {
        let manager = Manager::new().map_err(FatalError::new)?;
        let batteries = manager.batteries().map_err(FatalError::new)?;

        Ok(batteries
            .enumerate()
            .map(|(idx, battery)| match battery {
                Ok(battery) => Ok(to_reading(idx, &battery)),
                Err(e) => {
                    tracing::debug!(idx, error = %e, "battery unavailable");
                    Err(FatalError::new(e))
                }
            })
            .collect())
    }
}

fn to_reading(idx: usize, battery: &starship_battery::Battery) -> Reading {
    let name = battery
        .model()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("BAT{}", idx));
    let milli = |v: f32| finite(f64::from(v) * 1000.0);

    let mut reading = Reading::new(name);
    reading.record_state(Ok(State::from(battery.state())));
    reading.record(Field::Current, milli(battery.energy().get::<watt_hour>()));
    reading.record(Field::Full, milli(battery.energy_full().get::<watt_hour>()));
    reading.record(
        Field::Design,
        milli(battery.energy_full_design().get::<watt_hour>()),
    );
    reading.record(
        Field::ChargeRate,
        milli(battery.energy_rate().get::<watt>()).map(f64::abs),
    );
    let voltage = finite(f64::from(battery.voltage().get::<volt>()));
    reading.record(Field::DesignVoltage, voltage.clone());
    reading.record(Field::Voltage, voltage);
    reading
}
