//! Cross-platform battery status with per-field failure reporting.
//!
//! Every backend reads raw values from the OS and reports, per battery and
//! per field, whether the value could be obtained. Queries then escalate:
//! a battery with no failed field is returned as is, one with every field
//! failed becomes a [`FatalError`], anything in between is returned
//! together with its [`PartialError`].
//!
//! # Backends
//!
//! - Linux: sysfs (`/sys/class/power_supply`)
//! - macOS: `ioreg`
//! - FreeBSD, DragonFly: `/dev/acpi` ioctls
//! - illumos, Solaris: `kstat`
//! - everything else: `starship-battery`
//!
//! # Example
//!
//! ```no_run
//! use cellstat_platform::{get_all, BatchError};
//!
//! match get_all() {
//!     Ok(batteries) => {
//!         for battery in batteries {
//!             println!("{}: {}", battery.name, battery.state);
//!         }
//!     }
//!     Err(BatchError::Failed { batteries, errors }) => {
//!         for (battery, error) in batteries.iter().zip(errors.iter()) {
//!             match (battery, error) {
//!                 (Some(battery), None) => println!("{}: {}", battery.name, battery.state),
//!                 (_, Some(error)) => eprintln!("{}", error),
//!                 (None, None) => {}
//!             }
//!         }
//!     }
//!     Err(BatchError::Fatal(e)) => eprintln!("{}", e),
//! }
//! ```

mod battery;
mod error;
mod types;

pub mod acpi;
pub mod ioreg;
pub mod kstat;
pub mod manager;
pub mod raw;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub mod freebsd;

pub use battery::{Battery, BatterySource, Reading};
pub use error::{
    AllFieldsFailed, BatchError, Error, Errors, FatalError, Field, FieldError, PartialError,
    SlotError,
};
pub use types::State;

/// The native source for the target OS.
#[cfg(target_os = "linux")]
pub type PlatformSource = linux::SysfsSource;

#[cfg(target_os = "macos")]
pub type PlatformSource = ioreg::IoregSource;

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub type PlatformSource = freebsd::AcpiSource;

#[cfg(any(target_os = "illumos", target_os = "solaris"))]
pub type PlatformSource = kstat::KstatSource;

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "illumos",
    target_os = "solaris"
)))]
pub type PlatformSource = manager::ManagerSource;

/// Queries the battery at `idx` from the native source.
pub fn get(idx: usize) -> Result<Battery, Error> {
    PlatformSource::default().query_one(idx)
}

/// Queries every battery from the native source.
pub fn get_all() -> Result<Vec<Battery>, BatchError> {
    PlatformSource::default().query_all()
}
