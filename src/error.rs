//! Typed error hierarchy.
//!
//! Split along the same fault line the teacher crate uses: errors raised while
//! building a [`crate::config::VolumeConfig`] or a [`crate::registry::Registry`]
//! entry are surfaced to the caller (never to the USB host); errors a generator
//! could in principle hit are never allowed to propagate past it (see
//! [`DispatchError`] and §7 of the design notes).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("bytes per sector must be a power of two between 512 and 4096, got {0}")]
    InvalidBytesPerSector(u32),
    #[error("sectors per cluster must be a power of two, got {0}")]
    InvalidSectorsPerCluster(u32),
    #[error("cluster size of {0} bytes exceeds the 32MiB maximum")]
    ClusterSizeTooLarge(u64),
    #[error("volume is too small to hold the reserved system regions")]
    VolumeTooSmall,
    #[error("root directory must span at least one cluster")]
    EmptyRootDirectory,
    #[error("volume label must be at most 11 UTF-16 code units, got {0}")]
    LabelTooLong(usize),
    #[error("static region {name} cluster range [{start}, {end}) overlaps region {other}")]
    OverlappingRegions {
        name: &'static str,
        start: u32,
        end: u32,
        other: &'static str,
    },
    #[error("dynamic area start cluster {0} falls before the end of the root directory")]
    DynamicAreaOverlapsRootDir(u32),
    #[error("dynamic area end cluster {end} precedes its start cluster {start}")]
    DynamicAreaEmpty { start: u32, end: u32 },
    #[error("partition file-name template has no placeholder within its length")]
    BadPartitionNameTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no space left in the dynamic cluster area for {0} clusters")]
    OutOfSpace(u32),
    #[error("dynamic file registry is full")]
    RegistryFull,
    #[error("file name is longer than 127 UTF-16 code units: {0}")]
    NameTooLong(usize),
    #[error("file name must not be empty")]
    EmptyName,
    #[error("no such file registered at slot {0}")]
    NoSuchFile(usize),
    #[error("new size {new_size} does not fit in the {reserved} reserved bytes and this file does not own the tail of the dynamic area")]
    DoesNotFit { new_size: u64, reserved: u64 },
}

/// Internal invariant violations. In release builds these never escape a
/// generator; generators degrade to zero-filled output instead (§7 `BadSlice`
/// / `ExternalFetchFailure`). Kept as a real type so debug builds can assert
/// on it in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("byte offset {offset} is outside a {sector_size}-byte sector")]
    BadSlice { offset: u32, sector_size: u32 },
    #[error("external memory region fetch failed at offset {0}")]
    ExternalFetchFailure(u32),
}
