//! The top-level synthesized volume: owns geometry, configuration, the
//! dynamic file registry and the external memory provider, and answers
//! `READ10`-shaped requests by dispatching to the right generator.
//!
//! Plays the role the teacher's `Exfat` struct plays for a real format
//! operation (`format/mod.rs`), but every read is synthesised instead of
//! replayed from a written image, matching the dispatch loop in
//! `original_source/src/vd_virtual_disk.c`'s `tud_msc_read10_cb`.

use core::sync::atomic::{AtomicI64, Ordering};

use heapless::Vec;

use crate::config::VolumeConfig;
use crate::dispatch::{self, Dispatched, RegionKind, RegionTable};
use crate::error::ConfigError;
use crate::generators;
use crate::geometry::Geometry;
use crate::mem::MemoryProvider;
use crate::registry::Registry;

const REGION_TABLE_CAPACITY: usize = 64;

pub struct Volume<const MAX_FILES: usize, P: MemoryProvider> {
    geometry: Geometry,
    config: VolumeConfig,
    registry: Registry<MAX_FILES>,
    provider: P,
    volume_serial_number: u32,
    table: RegionTable<REGION_TABLE_CAPACITY>,
    /// Unix-epoch seconds every synthesised directory entry reports as its
    /// create/modify/access time. There's no real-time clock backing this
    /// volume, so it's whatever the caller last set — see [`Self::set_timestamp`].
    timestamp: AtomicI64,
}

impl<const MAX_FILES: usize, P: MemoryProvider> Volume<MAX_FILES, P> {
    pub fn new(
        config: VolumeConfig,
        provider: P,
        volume_serial_number: u32,
    ) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let registry = Registry::new(
            config.dynamic_area_start_cluster,
            config.dynamic_area_end_cluster,
            geometry.cluster_size_bytes(),
        );

        let mut table = RegionTable::new();
        dispatch::push_system_regions(&mut table);
        table.push(geometry.fat_offset + geometry.fat_length, RegionKind::Fat);
        table.push(
            geometry.bitmap_first_lba() + geometry.bitmap_length_sectors(),
            RegionKind::Bitmap,
        );
        table.push(
            geometry.upcase_first_lba() + geometry.upcase_length_sectors(),
            RegionKind::Upcase,
        );
        table.push(
            geometry.root_dir_first_lba() + geometry.root_dir_length_sectors(),
            RegionKind::RootDir,
        );

        let mut statics: Vec<(u32, RegionKind), 32> = Vec::new();
        for (idx, region) in config.static_regions.iter().enumerate() {
            let _ = statics.push((region.start_cluster, RegionKind::StaticRegion(idx as u8)));
        }
        for (t_idx, template) in config.partition_templates.iter().enumerate() {
            for partition in 0..template.count {
                let start =
                    template.start_cluster + partition as u32 * template.length_clusters_each;
                let _ = statics.push((start, RegionKind::Partition(t_idx as u8, partition)));
            }
        }
        statics.sort_unstable_by_key(|(start, _)| *start);

        for (start_cluster, kind) in statics.iter() {
            let length_clusters = match kind {
                RegionKind::StaticRegion(idx) => {
                    config.static_regions[*idx as usize].length_clusters
                }
                RegionKind::Partition(t, _) => {
                    config.partition_templates[*t as usize].length_clusters_each
                }
                _ => unreachable!("only StaticRegion/Partition rows are collected here"),
            };
            table.push(geometry.cluster_to_lba(start_cluster + length_clusters), *kind);
        }

        table.push(
            geometry.cluster_to_lba(config.dynamic_area_end_cluster),
            RegionKind::DynamicArea,
        );

        Ok(Self {
            geometry,
            config,
            registry,
            provider,
            volume_serial_number,
            table,
            timestamp: AtomicI64::new(0),
        })
    }

    /// Sets the Unix-epoch timestamp reported by every directory entry on
    /// subsequent reads. Call this once from a real-time clock source after
    /// construction; reads before the first call report the exFAT epoch.
    pub fn set_timestamp(&self, epoch_seconds: i64) {
        self.timestamp.store(epoch_seconds, Ordering::Relaxed);
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut Registry<MAX_FILES> {
        &mut self.registry
    }

    pub fn sector_count(&self) -> u64 {
        self.geometry.volume_length_sectors
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.geometry.bytes_per_sector
    }

    /// Synthesizes bytes `[sector_offset, sector_offset + dst.len())` of
    /// sector `lba`.
    pub fn read(&self, lba: u32, sector_offset: u32, dst: &mut [u8]) {
        if lba as u64 >= self.geometry.volume_length_sectors {
            dst.fill(0);
            return;
        }

        let Dispatched {
            kind,
            relative_sector,
            lba,
        } = self.table.dispatch(lba);

        match kind {
            RegionKind::BootRegion { .. } => generators::boot_region_sector(
                &self.geometry,
                self.volume_serial_number,
                relative_sector,
                sector_offset,
                dst,
            ),
            RegionKind::Fat => {
                generators::fat_sector(&self.geometry, relative_sector, sector_offset, dst)
            }
            RegionKind::Bitmap => generators::bitmap_sector(dst),
            RegionKind::Upcase => generators::upcase_sector(
                self.geometry.bytes_per_sector,
                relative_sector,
                sector_offset,
                dst,
            ),
            RegionKind::RootDir => generators::root_dir_window(
                &self.geometry,
                &self.config,
                &self.registry,
                crate::timestamp::pack_timestamp(self.timestamp.load(Ordering::Relaxed)),
                relative_sector,
                sector_offset,
                dst,
            ),
            RegionKind::StaticRegion(idx) => {
                let region = &self.config.static_regions[idx as usize];
                let offset = relative_sector as u64 * self.geometry.bytes_per_sector as u64
                    + sector_offset as u64;
                generators::mem_region_window(&self.provider, region.region_id, offset, dst);
            }
            RegionKind::Partition(t, p) => {
                let template = &self.config.partition_templates[t as usize];
                let offset = relative_sector as u64 * self.geometry.bytes_per_sector as u64
                    + sector_offset as u64;
                generators::mem_region_window(
                    &self.provider,
                    template.region_id + p as u32,
                    offset,
                    dst,
                );
            }
            RegionKind::DynamicArea => {
                let (cluster, sector_in_cluster) = self.geometry.lba_to_cluster(lba);
                let offset_in_cluster = sector_in_cluster as u64 * self.geometry.bytes_per_sector as u64
                    + sector_offset as u64;
                generators::dynamic_area_window(
                    &self.registry,
                    self.geometry.cluster_size_bytes(),
                    cluster,
                    offset_in_cluster,
                    dst,
                );
            }
            RegionKind::Zero => dst.fill(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeConfigBuilder;
    use crate::mem::SliceProvider;

    fn small_volume() -> Volume<4, SliceProvider<'static>> {
        let config = VolumeConfigBuilder::default()
            .volume_length_sectors(0x1000000 / 512)
            .dynamic_area_start_cluster(10)
            .dynamic_area_end_cluster(2000)
            .build()
            .unwrap();
        Volume::new(config, SliceProvider { region_id: 0, bytes: &[] }, 0xCAFEBABE).unwrap()
    }

    #[test]
    fn boot_sector_carries_signature_at_the_right_offset() {
        let volume = small_volume();
        let mut sector = [0u8; 512];
        volume.read(0, 0, &mut sector);
        assert_eq!(sector[510], 0x55);
        assert_eq!(sector[511], 0xAA);
    }

    #[test]
    fn reads_past_volume_length_are_zero() {
        let volume = small_volume();
        let mut sector = [0xFFu8; 512];
        volume.read(u32::MAX, 0, &mut sector);
        assert_eq!(sector, [0u8; 512]);
    }

    #[test]
    fn root_directory_label_entry_is_readable_through_the_dispatcher() {
        let volume = small_volume();
        let root_lba = volume.geometry().root_dir_first_lba();
        let mut sector = [0u8; 512];
        volume.read(root_lba, 0, &mut sector);
        assert_eq!(sector[0], 0x83); // volume label entry type, empty label
    }

    #[test]
    fn set_timestamp_is_readable_back_through_the_atomic() {
        let volume = small_volume();
        volume.set_timestamp(1_700_000_000);
        assert_eq!(volume.timestamp.load(Ordering::Relaxed), 1_700_000_000);
    }
}
