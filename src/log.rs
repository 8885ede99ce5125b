//! Conditional logging: `defmt` on-target, `log` on the host (`std`-feature
//! test harness), matching the dual-backend idiom used throughout the
//! `ghostfat` family of USB-MSC exFAT synthesisers. Neither backend is
//! required; with both features off the macros expand to nothing.

#[cfg(feature = "defmt-log")]
pub use defmt::{debug, error, warn};

#[cfg(all(feature = "log", not(feature = "defmt-log")))]
pub use log::{debug, error, warn};

#[cfg(not(any(feature = "log", feature = "defmt-log")))]
mod noop {
    #[macro_export]
    macro_rules! __vdisk_noop_log {
        ($($arg:tt)*) => {};
    }
    pub use __vdisk_noop_log as debug;
    pub use __vdisk_noop_log as error;
    pub use __vdisk_noop_log as warn;
}
#[cfg(not(any(feature = "log", feature = "defmt-log")))]
pub use noop::{debug, error, warn};
