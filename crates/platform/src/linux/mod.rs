//! Linux support via sysfs.

mod battery;

pub use battery::SysfsSource;
