use cellstat_platform::{BatterySource, Error};
use color_eyre::eyre::{eyre, Result};

use crate::config::OutputFormat;
use crate::output::{battery_line, partial_lines, Entry, Report};

pub fn run(
    source: &impl BatterySource,
    index: usize,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let (battery, errors) = match source.query_one(index) {
        Ok(battery) => (battery, None),
        Err(Error::Partial { battery, errors }) => (*battery, Some(errors)),
        Err(Error::NotFound) => return Err(eyre!("battery {} not found", index)),
        Err(Error::Fatal(e)) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => {
            let lines = errors.as_ref().map(partial_lines).unwrap_or_default();
            let entry = Entry::new(index, Some(&battery), errors.as_ref(), lines);
            Report::new(vec![entry]).print(compact)?;
        }
        OutputFormat::Text => {
            println!("{}", battery_line(&battery, errors.as_ref()));
            if let Some(errors) = &errors {
                for line in partial_lines(errors) {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    Ok(())
}
