pub mod config;
pub mod get;
pub mod list;

use cellstat_platform::PlatformSource;

use crate::config::UserConfig;

/// The native battery source, honoring config overrides.
#[cfg(target_os = "linux")]
pub fn battery_source(config: &UserConfig) -> PlatformSource {
    match &config.sysfs_root {
        Some(root) => {
            tracing::debug!(root = %root.display(), "using configured sysfs root");
            PlatformSource::with_root(root)
        }
        None => PlatformSource::default(),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn battery_source(_config: &UserConfig) -> PlatformSource {
    PlatformSource::default()
}
