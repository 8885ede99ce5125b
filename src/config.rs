//! Volume configuration surface.
//!
//! Built the same way the teacher builds [`FormatVolumeOptions`] in its
//! `format` module: a `derive_builder` struct with a custom `validate`
//! hook, except here the result backs a synthesised volume rather than a
//! real format operation, and the static regions / dynamic area bounds come
//! straight out of the original implementation's `picovd_config.h`.

use derive_builder::Builder;

use crate::error::ConfigError;
use crate::geometry::Geometry;
use crate::ring::NotifyPolicy;

/// One fixed, statically-placed memory-backed file (the BOOTROM/SRAM/FLASH
/// windows of `picovd_config.h`). Its content is never a cluster chain on
/// the FAT, only a direct mapping from cluster range to an external byte
/// provider.
#[derive(Clone, Copy, Debug)]
pub struct StaticRegion {
    /// File name as it appears in the root directory, UTF-16, NUL-padded.
    pub name: [u16; 32],
    pub name_len: u8,
    pub start_cluster: u32,
    pub length_clusters: u32,
    /// Opaque handle a [`crate::mem::MemoryRegion`] callback uses to find
    /// the right backing store; meaningless to this crate otherwise.
    pub region_id: u32,
}

/// A numbered template for a fixed set of same-shaped files such as
/// `PICOVD_BOOTROM_PARTITIONS_*`'s `"PARTx.BIN"` naming; `x` is replaced by
/// each partition's index at directory-assembly time.
#[derive(Clone, Copy, Debug)]
pub struct PartitionTemplate {
    pub name_template: [u16; 32],
    pub name_len: u8,
    pub placeholder_index: u8,
    pub count: u8,
    pub region_id: u32,
    pub start_cluster: u32,
    pub length_clusters_each: u32,
}

#[derive(Builder, Clone, Debug)]
#[builder(no_std, build_fn(validate = "Self::validate"))]
pub struct VolumeConfig {
    #[builder(default = 512)]
    pub bytes_per_sector: u32,
    #[builder(default = 8)]
    pub sectors_per_cluster: u32,
    pub volume_length_sectors: u64,
    #[builder(default = 1)]
    pub root_dir_length_clusters: u32,
    /// UTF-16 volume label, at most 11 code units; empty means no label.
    #[builder(default)]
    pub label: [u16; 11],
    #[builder(default)]
    pub label_len: u8,
    #[builder(default)]
    pub volume_guid: Option<u128>,
    #[builder(default)]
    pub static_regions: heapless::Vec<StaticRegion, 8>,
    #[builder(default)]
    pub partition_templates: heapless::Vec<PartitionTemplate, 2>,
    /// First and one-past-last cluster of the area dynamic files may be
    /// registered into; must not overlap the root directory or static
    /// regions.
    pub dynamic_area_start_cluster: u32,
    pub dynamic_area_end_cluster: u32,
    /// Upper bound on simultaneously registered dynamic files
    /// (`PICOVD_PARAM_MAX_DYNAMIC_FILES`).
    #[builder(default = 12)]
    pub max_dynamic_files: usize,

    /// `PICOVD_STDOUT_TAIL_UA_MINIMUM_AMOUNT`: unread bytes on a notify-on-
    /// write stream must exceed this before a tail notification is even
    /// considered.
    #[builder(default = 128)]
    pub stdout_tail_notify_threshold_bytes: u64,
    /// `PICOVD_STDOUT_TAIL_UA_DELAY_SEC`.
    #[builder(default = 10)]
    pub stdout_tail_delay_sec: u64,
    /// `PICOVD_STDOUT_TAIL_UA_TIMEOUT_SEC`.
    #[builder(default = 30)]
    pub stdout_tail_timeout_sec: u64,
    /// `CFG_TUD_MSC_EP_BUFSIZE`: the USB mass-storage endpoint buffer size a
    /// tail window is rounded down to.
    #[builder(default = 512)]
    pub usb_endpoint_buffer_bytes: u64,
    /// Minimum spacing between two Unit Attention reports, so a burst of
    /// TEST UNIT READY polls right after a change notification only pays
    /// for re-enumeration once. Not named in `picovd_config.h`; this crate's
    /// own choice (see DESIGN.md).
    #[builder(default = 200)]
    pub ua_minimum_delay_ms: u64,
}

impl VolumeConfigBuilder {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(label_len) = self.label_len {
            if label_len as usize > 11 {
                return Err(ConfigError::LabelTooLong(label_len as usize));
            }
        }
        Ok(())
    }
}

impl VolumeConfig {
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        let geometry = Geometry::derive(
            self.bytes_per_sector,
            self.sectors_per_cluster,
            self.volume_length_sectors,
            self.root_dir_length_clusters,
        )?;

        let root_end = geometry.root_dir_start_cluster + geometry.root_dir_length_clusters;
        if self.dynamic_area_start_cluster < root_end {
            return Err(ConfigError::DynamicAreaOverlapsRootDir(
                self.dynamic_area_start_cluster,
            ));
        }
        if self.dynamic_area_end_cluster <= self.dynamic_area_start_cluster {
            return Err(ConfigError::DynamicAreaEmpty {
                start: self.dynamic_area_start_cluster,
                end: self.dynamic_area_end_cluster,
            });
        }

        for region in self.static_regions.iter() {
            let region_end = region.start_cluster + region.length_clusters;
            if region.start_cluster < self.dynamic_area_end_cluster
                && region_end > self.dynamic_area_start_cluster
            {
                return Err(ConfigError::OverlappingRegions {
                    name: "static region",
                    start: region.start_cluster,
                    end: region_end,
                    other: "dynamic area",
                });
            }
        }

        for template in self.partition_templates.iter() {
            if template.placeholder_index as usize >= template.name_len as usize {
                return Err(ConfigError::BadPartitionNameTemplate);
            }
        }

        Ok(geometry)
    }

    /// Builds the [`NotifyPolicy`] a [`crate::ring::TailNotifier`] over this
    /// volume's stdout-style stream should use, straight from the matching
    /// `stdout_tail_*`/`usb_endpoint_buffer_bytes` knobs.
    pub fn stdout_notify_policy(&self) -> NotifyPolicy {
        NotifyPolicy {
            minimum_unread_bytes: self.stdout_tail_notify_threshold_bytes,
            delay_sec: self.stdout_tail_delay_sec,
            timeout_sec: self.stdout_tail_timeout_sec,
            endpoint_buffer_bytes: self.usb_endpoint_buffer_bytes,
        }
    }
}
