//! The ordered region table and LBA dispatcher.
//!
//! Ported from `original_source/src/vd_virtual_disk.c`'s `lba_regions[]`
//! table and the linear scan in `tud_msc_read10_cb`: each entry names the
//! exclusive LBA upper bound of a region and a `RegionKind`; `dispatch`
//! walks the table once and hands the matching generator the sector's
//! offset relative to the start of its region, exactly as the original's
//! `gen_*` functions receive a region-relative LBA.

use heapless::Vec;

use crate::geometry::{BOOT_REGION_SECTORS, FAT_REGION_START_LBA};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    /// One full 12-sector boot region (boot sector, 8 extended boot
    /// sectors, OEM parameters, reserved, checksum); `backup` selects
    /// whether the serial-number-bearing boot sector is the main or the
    /// backup copy (content is otherwise identical).
    BootRegion { backup: bool },
    Fat,
    Bitmap,
    Upcase,
    RootDir,
    /// Index into `VolumeConfig::static_regions`.
    StaticRegion(u8),
    /// `(template index, partition index)` into `VolumeConfig::partition_templates`.
    Partition(u8, u8),
    DynamicArea,
    /// Anything not backed by a defined region reads back as zero —
    /// padding inside the FAT region past FAT0, and the tail of the volume
    /// past the dynamic area.
    Zero,
}

/// One row of the dispatch table: `end_lba` is this region's exclusive
/// upper bound; regions are pushed in ascending LBA order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Row {
    end_lba: u32,
    kind: RegionKind,
}

pub struct RegionTable<const N: usize> {
    rows: Vec<Row, N>,
}

/// The result of a successful dispatch: which generator to run, the
/// sector's index relative to the start of its region, and the absolute LBA
/// (some generators, like the checksum sector, need both).
pub struct Dispatched {
    pub kind: RegionKind,
    pub relative_sector: u32,
    pub lba: u32,
}

impl<const N: usize> RegionTable<N> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Appends a region ending at `end_lba`. Regions must be pushed in
    /// strictly ascending `end_lba` order; violating this is a programmer
    /// error in `Volume::new`, not a runtime condition, so it panics.
    pub fn push(&mut self, end_lba: u32, kind: RegionKind) {
        if let Some(last) = self.rows.last() {
            assert!(end_lba > last.end_lba, "region table must be ascending");
        }
        self.rows
            .push(Row { end_lba, kind })
            .unwrap_or_else(|_| panic!("region table capacity {N} exceeded"));
    }

    /// Finds the first region whose bound exceeds `lba`. `volume_length`
    /// must be respected by the caller: LBAs at or past it are out of
    /// range and not this table's concern.
    pub fn dispatch(&self, lba: u32) -> Dispatched {
        let mut start = 0u32;
        for row in self.rows.iter() {
            if lba < row.end_lba {
                return Dispatched {
                    kind: row.kind,
                    relative_sector: lba - start,
                    lba,
                };
            }
            start = row.end_lba;
        }
        Dispatched {
            kind: RegionKind::Zero,
            relative_sector: lba - start,
            lba,
        }
    }
}

impl<const N: usize> Default for RegionTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the table for the fixed system regions (both boot regions and the
/// FAT); the cluster-heap regions (bitmap, up-case, root dir, static
/// regions, dynamic area) are appended by `Volume::new` once geometry and
/// config are both known.
pub fn push_system_regions<const N: usize>(table: &mut RegionTable<N>) {
    table.push(BOOT_REGION_SECTORS, RegionKind::BootRegion { backup: false });
    table.push(
        BOOT_REGION_SECTORS * 2,
        RegionKind::BootRegion { backup: true },
    );
    debug_assert_eq!(BOOT_REGION_SECTORS * 2, FAT_REGION_START_LBA);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_boot_regions_then_fat() {
        let mut table: RegionTable<8> = RegionTable::new();
        push_system_regions(&mut table);
        table.push(FAT_REGION_START_LBA + 4, RegionKind::Fat);

        let d = table.dispatch(0);
        assert_eq!(d.kind, RegionKind::BootRegion { backup: false });
        assert_eq!(d.relative_sector, 0);

        let d = table.dispatch(13);
        assert_eq!(d.kind, RegionKind::BootRegion { backup: true });
        assert_eq!(d.relative_sector, 1);

        let d = table.dispatch(25);
        assert_eq!(d.kind, RegionKind::Fat);
        assert_eq!(d.relative_sector, 1);
    }

    #[test]
    fn past_every_region_reads_as_zero() {
        let mut table: RegionTable<8> = RegionTable::new();
        push_system_regions(&mut table);
        let d = table.dispatch(10_000);
        assert_eq!(d.kind, RegionKind::Zero);
    }
}
