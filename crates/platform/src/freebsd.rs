//! FreeBSD and DragonFly support via the `/dev/acpi` battery ioctls.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

use crate::acpi::{
    decode_bif, decode_bst, scan_units, raw_battery, BatteryInfo, BatteryStatus, MAX_UNITS,
};
use crate::battery::{BatterySource, Reading};
use crate::error::{FatalError, FieldError};

const ACPI_DEVICE: &str = "/dev/acpi";

/// Size of `union acpi_battery_ioctl_arg`.
const ARG_SIZE: usize = 164;

const IOC_INOUT: u32 = 0xC000_0000;
const IOCPARM_MASK: u32 = 0x1fff;

const fn iowr(group: u8, num: u8, len: usize) -> libc::c_ulong {
    (IOC_INOUT | ((len as u32 & IOCPARM_MASK) << 16) | ((group as u32) << 8) | num as u32)
        as libc::c_ulong
}

const ACPIIO_BATT_GET_BIF: libc::c_ulong = iowr(b'B', 0x10, ARG_SIZE);
const ACPIIO_BATT_GET_BST: libc::c_ulong = iowr(b'B', 0x11, ARG_SIZE);

#[derive(Debug, Clone, Copy, Default)]
pub struct AcpiSource;

impl AcpiSource {
    fn open(&self) -> Result<File, FatalError> {
        File::open(ACPI_DEVICE).map_err(|e| {
            tracing::debug!(device = ACPI_DEVICE, error = %e, "cannot open ACPI device");
            FatalError::new(e)
        })
    }
}

/// Issues a battery ioctl for `unit` and returns the filled argument union.
fn battery_ioctl(device: &File, request: libc::c_ulong, unit: usize) -> io::Result<Vec<u8>> {
    // The union is int-aligned; the unit number goes in its first member.
    let mut arg = [0u32; ARG_SIZE / 4];
    arg[0] = unit as u32;

    // SAFETY: `arg` is a live, aligned buffer of exactly the size encoded in
    // `request`, and the descriptor stays open for the duration of the call.
    let result = unsafe { libc::ioctl(device.as_raw_fd(), request, arg.as_mut_ptr()) };
    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(arg.iter().flat_map(|word| word.to_ne_bytes()).collect())
}

fn read_info(device: &File, unit: usize) -> io::Result<Option<BatteryInfo>> {
    match battery_ioctl(device, ACPIIO_BATT_GET_BIF, unit) {
        Ok(buf) => decode_bif(&buf)
            .map(Some)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "short acpi_bif")),
        Err(e) if e.raw_os_error() == Some(libc::ENXIO) => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_status(device: &File, unit: usize) -> Result<BatteryStatus, FieldError> {
    let buf = battery_ioctl(device, ACPIIO_BATT_GET_BST, unit)?;
    decode_bst(&buf).ok_or_else(|| FieldError::Malformed("short acpi_bst".into()))
}

/// Reads one unit. `Ok(None)` means the unit does not exist.
fn read_unit(device: &File, unit: usize) -> Result<Option<Reading>, FatalError> {
    let Some(info) = read_info(device, unit)? else {
        return Ok(None);
    };
    let status = read_status(device, unit);
    if let Err(err) = &status {
        tracing::debug!(unit, error = %err, "battery status unavailable");
    }
    Ok(Some(
        raw_battery(&info, status).into_reading(format!("BAT{}", unit)),
    ))
}

impl BatterySource for AcpiSource {
    fn read_all(&self) -> Result<Vec<Result<Reading, FatalError>>, FatalError> {
        let device = self.open()?;
        let readings = scan_units(|unit| read_unit(&device, unit));
        tracing::debug!(count = readings.len(), "scanned ACPI batteries");
        Ok(readings)
    }

    /// Indices follow [`AcpiSource::read_all`].
    fn read(&self, idx: usize) -> Result<Option<Reading>, FatalError> {
        if idx >= MAX_UNITS {
            return Ok(None);
        }
        match self.read_all()?.into_iter().nth(idx) {
            Some(reading) => reading.map(Some),
            None => Ok(None),
        }
    }
}
