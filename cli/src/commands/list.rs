use cellstat_platform::{BatchError, Battery, BatterySource, Errors, SlotError};
use color_eyre::eyre::{eyre, Result};

use crate::config::OutputFormat;
use crate::output::{battery_line, slot_lines, Entry, Report};

pub fn run(source: &impl BatterySource, format: OutputFormat, compact: bool) -> Result<()> {
    let (batteries, errors): (Vec<Option<Battery>>, Option<Errors>) = match source.query_all() {
        Ok(batteries) => (batteries.into_iter().map(Some).collect(), None),
        Err(BatchError::Failed { batteries, errors }) => (batteries, Some(errors)),
        Err(BatchError::Fatal(e)) => return Err(e.into()),
    };
    let slot = |idx: usize| errors.as_ref().and_then(|e| e.get(idx));
    let partial = |idx: usize| match slot(idx) {
        Some(SlotError::Partial(p)) => Some(p),
        _ => None,
    };

    match format {
        OutputFormat::Json => {
            let entries = batteries
                .iter()
                .enumerate()
                .map(|(idx, battery)| {
                    let lines = slot(idx).map(slot_lines).unwrap_or_default();
                    Entry::new(idx, battery.as_ref(), partial(idx), lines)
                })
                .collect();
            Report::new(entries).print(compact)?;
        }
        OutputFormat::Text => {
            if batteries.is_empty() {
                eprintln!("No batteries found");
            }
            for (idx, battery) in batteries.iter().enumerate() {
                if let Some(battery) = battery {
                    println!("{}", battery_line(battery, partial(idx)));
                }
            }
            if let Some(errors) = &errors {
                eprintln!("{}", errors);
            }
        }
    }

    if !batteries.is_empty() && batteries.iter().all(Option::is_none) {
        return Err(eyre!("no battery could be read"));
    }
    Ok(())
}
