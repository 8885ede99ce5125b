//! Per-region sector generators. Each function honors the same contract:
//! given a sector-relative byte offset and a destination slice that may be
//! shorter than a full sector, it fills exactly `dst.len()` bytes of that
//! sector's content — never more, never reading or writing outside `dst`.
//!
//! Ported from `original_source/src/vd_virtual_disk.c`'s `gen_boot_sector`,
//! `gen_extb_sector`, `gen_cksm_sector`, `gen_fat0_sector` and
//! `gen_upcs_sector`, generalized from that file's fixed 1GiB layout to an
//! arbitrary [`Geometry`].

use crate::boot_sector::BootSector;
use crate::checksum::vbr_checksum_over;
use crate::config::VolumeConfig;
use crate::directory;
use crate::geometry::{
    CHECKSUM_SECTOR_RELATIVE, EOF_FAT_ENTRY, FIRST_SYSTEM_FAT_ENTRY, Geometry, SECTOR_SIZE_MAX,
};
use crate::log::warn;
use crate::mem::MemoryProvider;
use crate::registry::Registry;

/// Copies `full[offset..offset + dst.len()]` into `dst`. A generator only
/// ever calls this with an in-bounds `offset` computed by the dispatcher; an
/// out-of-bounds slice is an internal bug, not a device fault, so release
/// builds degrade to zeros instead of panicking (§7 invariant).
fn copy_window(full: &[u8], offset: u32, dst: &mut [u8]) {
    let offset = offset as usize;
    match full.get(offset..offset + dst.len()) {
        Some(src) => dst.copy_from_slice(src),
        None => {
            debug_assert!(
                false,
                "sector slice out of bounds: offset {offset} len {}",
                dst.len()
            );
            warn!("sector slice out of bounds, degrading to zero: offset {}", offset);
            dst.fill(0);
        }
    }
}

fn synth_boot_subsector(geometry: &Geometry, serial: u32, relative_sector: u32, buf: &mut [u8]) {
    match relative_sector {
        0 => {
            let boot = BootSector::build(geometry, serial);
            buf.copy_from_slice(bytemuck::bytes_of(&boot));
        }
        1..=8 => {
            // Extended boot sector: empty, but still carries the boot signature.
            buf.fill(0);
            let len = buf.len();
            buf[len - 2] = 0x55;
            buf[len - 1] = 0xAA;
        }
        9 | 10 => buf.fill(0), // OEM parameters, reserved
        other => unreachable!("boot region sector {other} out of range"),
    }
}

/// Fills `dst` with bytes `[sector_offset, sector_offset + dst.len())` of
/// the boot region's sector `relative_sector` (0..12). Both the main and
/// backup boot regions share this function since their content is
/// identical (§3.1).
pub fn boot_region_sector(
    geometry: &Geometry,
    volume_serial_number: u32,
    relative_sector: u32,
    sector_offset: u32,
    dst: &mut [u8],
) {
    let bytes_per_sector = geometry.bytes_per_sector as usize;
    let mut storage = [0u8; SECTOR_SIZE_MAX as usize];
    let full = &mut storage[..bytes_per_sector];

    if relative_sector == CHECKSUM_SECTOR_RELATIVE {
        let checksum = vbr_checksum_over(geometry.bytes_per_sector, |lba, buf| {
            boot_region_sector(geometry, volume_serial_number, lba, 0, buf)
        });
        let checksum_bytes = checksum.to_le_bytes();
        for chunk in full.chunks_exact_mut(4) {
            chunk.copy_from_slice(&checksum_bytes);
        }
    } else {
        synth_boot_subsector(geometry, volume_serial_number, relative_sector, full);
    }

    copy_window(full, sector_offset, dst);
}

/// Fills `dst` with bytes of FAT sector `relative_sector`: the only defined
/// content is the media-descriptor marker at entry 0, the EOF marker at
/// entry 1, and one EOF marker each for the bitmap, up-case table and root
/// directory's first (and, since every chain on this volume is contiguous,
/// only) cluster. Everything else in the FAT region reads back as zero —
/// compliant readers never walk it anyway, since every stream's
/// `NoFatChain` bit is set.
pub fn fat_sector(
    geometry: &Geometry,
    relative_sector: u32,
    sector_offset: u32,
    dst: &mut [u8],
) {
    let bytes_per_sector = geometry.bytes_per_sector as usize;
    let mut storage = [0u8; SECTOR_SIZE_MAX as usize];
    let full = &mut storage[..bytes_per_sector];
    full.fill(0);

    let sector_byte_start = relative_sector as u64 * bytes_per_sector as u64;
    let sector_byte_end = sector_byte_start + bytes_per_sector as u64;
    let mut splice = |fat_index: u32, value: u32| {
        let entry_offset = fat_index as u64 * 4;
        if entry_offset + 4 <= sector_byte_start || entry_offset >= sector_byte_end {
            return;
        }
        let local = (entry_offset - sector_byte_start) as usize;
        full[local..local + 4].copy_from_slice(&value.to_le_bytes());
    };

    splice(0, FIRST_SYSTEM_FAT_ENTRY);
    splice(1, EOF_FAT_ENTRY);
    splice(geometry.bitmap_start_cluster, EOF_FAT_ENTRY);
    splice(geometry.upcase_start_cluster, EOF_FAT_ENTRY);
    splice(geometry.root_dir_start_cluster, EOF_FAT_ENTRY);

    copy_window(full, sector_offset, dst);
}

/// The allocation bitmap is kept at its simplest correct value: every
/// addressable cluster marked allocated (see SPEC_FULL.md §9's decision on
/// this open question).
pub fn bitmap_sector(dst: &mut [u8]) {
    dst.fill(0xFF);
}

pub fn upcase_sector(
    bytes_per_sector: u32,
    relative_sector: u32,
    sector_offset: u32,
    dst: &mut [u8],
) {
    let table = crate::upcase::bytes();
    let mut storage = [0u8; SECTOR_SIZE_MAX as usize];
    let full = &mut storage[..bytes_per_sector as usize];
    full.fill(0);

    let byte_start = relative_sector as u64 * bytes_per_sector as u64;
    for (i, slot) in full.iter_mut().enumerate() {
        let pos = byte_start + i as u64;
        if pos < table.len() as u64 {
            *slot = table[pos as usize];
        }
    }

    copy_window(full, sector_offset, dst);
}

#[allow(clippy::too_many_arguments)]
pub fn root_dir_window<const MAX_FILES: usize>(
    geometry: &Geometry,
    config: &VolumeConfig,
    registry: &Registry<MAX_FILES>,
    timestamp: u32,
    relative_sector: u32,
    sector_offset: u32,
    dst: &mut [u8],
) {
    directory::render_window(
        geometry,
        config,
        registry,
        timestamp,
        relative_sector,
        sector_offset,
        dst,
    );
}

/// A static region's (or expanded partition's) data cluster: bytes are
/// fetched from an external provider keyed by `region_id`; a fetch failure
/// degrades to zeros rather than propagating (§7).
pub fn mem_region_window<P: MemoryProvider>(
    provider: &P,
    region_id: u32,
    offset_in_region: u64,
    dst: &mut [u8],
) {
    if provider.read(region_id, offset_in_region as u32, dst).is_err() {
        warn!("external region {} fetch failed at offset {}, degrading to zero", region_id, offset_in_region);
        dst.fill(0);
    }
}

/// A dynamic file's data cluster: resolved by cluster number against the
/// registry, then read from that file's own [`crate::registry::DynamicFileContent`].
pub fn dynamic_area_window<const MAX_FILES: usize>(
    registry: &Registry<MAX_FILES>,
    cluster_size_bytes: u64,
    cluster: u32,
    offset_in_cluster: u64,
    dst: &mut [u8],
) {
    match registry.file_containing_cluster(cluster) {
        Some(view) => {
            let file_offset =
                (cluster - view.first_cluster) as u64 * cluster_size_bytes + offset_in_cluster;
            view.content.read_at(file_offset, dst);
        }
        None => dst.fill(0),
    }
}
