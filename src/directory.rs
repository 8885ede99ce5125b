//! Assembles the root directory's bytes on demand: the teacher's
//! `dir/mod.rs` builds a `RawRoot` once and serializes it to a real device;
//! here the same entry-set shapes back a window-at-a-time renderer so no
//! full directory image is ever held in memory, matching
//! `original_source/src/vd_exfat_dirs.h`'s static/dynamic entry-set structs.

use crate::checksum::name_hash;
use crate::config::VolumeConfig;
use crate::entry::{
    AllocationBitmapEntry, FileAttributes, FileDirectoryEntry, StreamExtensionEntry,
    UpcaseTableEntry, VolumeLabelEntry, file_name_entries, finalize_set_checksum,
};
use crate::geometry::Geometry;
use crate::registry::Registry;
use crate::upcase::upcase_unit;

/// `FileDirectory` + `StreamExtension` + up to 9 `FileName` entries (127
/// UTF-16 code units), matching the registry's own name cap.
const MAX_ENTRIES_PER_FILE_SET: usize = 11;
const MAX_FILE_SET_BYTES: usize = MAX_ENTRIES_PER_FILE_SET * 32;

struct FileItem {
    name: [u16; 127],
    name_len: u8,
    first_cluster: u32,
    data_len: u64,
    attributes: FileAttributes,
}

fn expand_partition_name(template: &[u16; 32], placeholder_index: u8, partition: u8) -> [u16; 32] {
    let mut name = *template;
    name[placeholder_index as usize] = b'0' as u16 + partition as u16;
    name
}

fn static_item_count(config: &VolumeConfig) -> usize {
    config.static_regions.len()
        + config
            .partition_templates
            .iter()
            .map(|t| t.count as usize)
            .sum::<usize>()
}

fn static_item_at(config: &VolumeConfig, geometry: &Geometry, index: usize) -> Option<FileItem> {
    if index < config.static_regions.len() {
        let region = &config.static_regions[index];
        let mut name = [0u16; 127];
        name[..32].copy_from_slice(&region.name);
        return Some(FileItem {
            name,
            name_len: region.name_len,
            first_cluster: region.start_cluster,
            data_len: region.length_clusters as u64 * geometry.cluster_size_bytes(),
            attributes: FileAttributes::ARCHIVE | FileAttributes::READ_ONLY,
        });
    }
    let mut remaining = index - config.static_regions.len();
    for template in config.partition_templates.iter() {
        if remaining < template.count as usize {
            let partition = remaining as u8;
            let name32 =
                expand_partition_name(&template.name_template, template.placeholder_index, partition);
            let mut name = [0u16; 127];
            name[..32].copy_from_slice(&name32);
            return Some(FileItem {
                name,
                name_len: template.name_len,
                first_cluster: template.start_cluster
                    + partition as u32 * template.length_clusters_each,
                data_len: template.length_clusters_each as u64 * geometry.cluster_size_bytes(),
                attributes: FileAttributes::ARCHIVE | FileAttributes::READ_ONLY,
            });
        }
        remaining -= template.count as usize;
    }
    None
}

fn dynamic_item_at<const MAX_FILES: usize>(
    registry: &Registry<MAX_FILES>,
    index: usize,
) -> Option<FileItem> {
    let view = registry.iter().nth(index)?;
    let mut name = [0u16; 127];
    name[..view.name.len()].copy_from_slice(view.name);
    Some(FileItem {
        name,
        name_len: view.name.len() as u8,
        first_cluster: view.first_cluster,
        data_len: view.content.len(),
        attributes: view.attributes,
    })
}

fn render_file_set(item: &FileItem, timestamp: u32, buf: &mut [u8; MAX_FILE_SET_BYTES]) -> usize {
    let name = &item.name[..item.name_len as usize];
    let secondary_count = 1 + name.len().div_ceil(15).max(1) as u8;
    let mut upcased = [0u16; 127];
    for (dst, &src) in upcased.iter_mut().zip(name.iter()) {
        *dst = upcase_unit(src);
    }
    let hash = name_hash(&upcased[..name.len()]);

    let file_entry = FileDirectoryEntry::new(secondary_count, item.attributes, timestamp);
    let stream_entry = StreamExtensionEntry::new(
        name.len() as u8,
        hash,
        item.first_cluster,
        item.data_len,
    );

    buf[0..32].copy_from_slice(bytemuck::bytes_of(&file_entry));
    buf[32..64].copy_from_slice(bytemuck::bytes_of(&stream_entry));

    let mut offset = 64;
    for name_entry in file_name_entries(name) {
        buf[offset..offset + 32].copy_from_slice(bytemuck::bytes_of(&name_entry));
        offset += 32;
    }

    let total = offset;
    finalize_set_checksum(&mut buf[..total]);
    total
}

/// Renders root-directory sector 0: the three fixed entries (volume label,
/// allocation-bitmap descriptor, up-case-table descriptor) packed at bytes
/// 0/32/64, followed by one entry set per compile-time static file. Per §3,
/// every static file is expected to fit within this single sector alongside
/// the fixed entries; any overflow is silently dropped rather than spilling
/// into the dynamic sectors that follow, since a conforming configuration
/// never has enough static files to reach that edge.
fn render_fixed_sector(geometry: &Geometry, config: &VolumeConfig, timestamp: u32, full: &mut [u8]) {
    let label = VolumeLabelEntry::new(&config.label[..config.label_len as usize]);
    full[0..32].copy_from_slice(bytemuck::bytes_of(&label));

    let bitmap_len_bytes = (geometry.cluster_count as u64).div_ceil(8);
    let bitmap = AllocationBitmapEntry::new(geometry.bitmap_start_cluster, bitmap_len_bytes);
    full[32..64].copy_from_slice(bytemuck::bytes_of(&bitmap));

    let upcase_bytes = crate::upcase::bytes();
    let upcase = UpcaseTableEntry::new(
        geometry.upcase_start_cluster,
        upcase_bytes.len() as u64,
        crate::upcase::checksum(),
    );
    full[64..96].copy_from_slice(bytemuck::bytes_of(&upcase));

    let mut cursor = 96usize;
    for index in 0..static_item_count(config) {
        let Some(item) = static_item_at(config, geometry, index) else {
            continue;
        };
        let mut buf = [0u8; MAX_FILE_SET_BYTES];
        let rendered = render_file_set(&item, timestamp, &mut buf);
        if cursor + rendered > full.len() {
            break;
        }
        full[cursor..cursor + rendered].copy_from_slice(&buf[..rendered]);
        cursor += rendered;
    }
}

/// Fills `dst` with bytes `[sector_offset, sector_offset + dst.len())` of
/// root-directory sector `relative_sector`. Sector 0 is the fixed sector
/// (§4.5); every sector after that holds exactly one dynamic file's entry
/// set at slot `relative_sector - 1` (§4.6, §8 testable property 3), matching
/// `original_source/src/vd_exfat_directory.c`'s `slot_idx = lba -
/// EXFAT_ROOT_DIR_START_LBA - 1u` addressing. A slot with no registered file,
/// or bytes past the last defined entry within a sector, read back as zero.
pub fn render_window<const MAX_FILES: usize>(
    geometry: &Geometry,
    config: &VolumeConfig,
    registry: &Registry<MAX_FILES>,
    timestamp: u32,
    relative_sector: u32,
    sector_offset: u32,
    dst: &mut [u8],
) {
    let bytes_per_sector = geometry.bytes_per_sector as usize;
    let mut storage = [0u8; crate::geometry::SECTOR_SIZE_MAX as usize];
    let full = &mut storage[..bytes_per_sector];
    full.fill(0);

    if relative_sector == 0 {
        render_fixed_sector(geometry, config, timestamp, full);
    } else if let Some(item) = dynamic_item_at(registry, (relative_sector - 1) as usize) {
        let mut buf = [0u8; MAX_FILE_SET_BYTES];
        let rendered = render_file_set(&item, timestamp, &mut buf);
        full[..rendered].copy_from_slice(&buf[..rendered]);
    }

    let offset = sector_offset as usize;
    dst.copy_from_slice(&full[offset..offset + dst.len()]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StaticRegion, VolumeConfigBuilder};

    fn test_geometry() -> Geometry {
        Geometry::derive(512, 8, 0x40000000 / 512, 1).unwrap()
    }

    #[test]
    fn label_lands_in_the_first_entry() {
        let geometry = test_geometry();
        let mut label = [0u16; 11];
        let text = [b'H' as u16, b'i' as u16];
        label[..2].copy_from_slice(&text);
        let config = VolumeConfigBuilder::default()
            .volume_length_sectors(0x40000000 / 512)
            .dynamic_area_start_cluster(geometry.root_dir_start_cluster + 1)
            .dynamic_area_end_cluster(geometry.root_dir_start_cluster + 1000)
            .label(label)
            .label_len(2)
            .build()
            .unwrap();
        let registry: Registry<4> = Registry::new(
            config.dynamic_area_start_cluster,
            config.dynamic_area_end_cluster,
            geometry.cluster_size_bytes(),
        );

        let mut out = [0u8; 32];
        render_window(&geometry, &config, &registry, 0, 0, 0, &mut out);
        assert_eq!(out[0], 0x83);
        assert_eq!(out[1], 2);
    }

    #[test]
    fn static_region_produces_a_checksummed_entry_set() {
        let geometry = test_geometry();
        let mut regions = heapless::Vec::new();
        let mut name = [0u16; 32];
        let n: Vec<u16> = "A.TXT".encode_utf16().collect();
        name[..n.len()].copy_from_slice(&n);
        regions
            .push(StaticRegion {
                name,
                name_len: n.len() as u8,
                start_cluster: geometry.root_dir_start_cluster + 1,
                length_clusters: 1,
                region_id: 1,
            })
            .unwrap();
        let config = VolumeConfigBuilder::default()
            .volume_length_sectors(0x40000000 / 512)
            .static_regions(regions)
            .dynamic_area_start_cluster(geometry.root_dir_start_cluster + 2)
            .dynamic_area_end_cluster(geometry.root_dir_start_cluster + 1000)
            .build()
            .unwrap();
        let registry: Registry<4> = Registry::new(
            config.dynamic_area_start_cluster,
            config.dynamic_area_end_cluster,
            geometry.cluster_size_bytes(),
        );

        let mut out = [0u8; 96];
        render_window(&geometry, &config, &registry, 0, 0, 96, &mut out);
        assert_eq!(out[0], 0x85); // FileDirectory
        assert_eq!(out[32], 0xC0); // StreamExtension
        assert_eq!(out[64], 0xC1); // FileName
    }

    #[test]
    fn dynamic_file_occupies_its_own_dedicated_sector() {
        let geometry = test_geometry();
        let config = VolumeConfigBuilder::default()
            .volume_length_sectors(0x40000000 / 512)
            .dynamic_area_start_cluster(geometry.root_dir_start_cluster + 1)
            .dynamic_area_end_cluster(geometry.root_dir_start_cluster + 1000)
            .build()
            .unwrap();
        let mut registry: Registry<4> = Registry::new(
            config.dynamic_area_start_cluster,
            config.dynamic_area_end_cluster,
            geometry.cluster_size_bytes(),
        );
        static LOG: crate::ring::RingBuffer<64> = crate::ring::RingBuffer::new();
        let name: Vec<u16> = "LOG.TXT".encode_utf16().collect();
        registry
            .add(&name, 4096, FileAttributes::ARCHIVE, &LOG)
            .unwrap();

        // Sector 0 (the fixed sector) carries no trace of the dynamic file.
        let mut fixed = [0u8; 512];
        render_window(&geometry, &config, &registry, 0, 0, 0, &mut fixed);
        assert_eq!(fixed[96], 0); // no static files registered, tail is zero

        // Sector 1 (slot 0) carries exactly this one dynamic file's entry set.
        let mut dynamic = [0u8; 512];
        render_window(&geometry, &config, &registry, 0, 1, 0, &mut dynamic);
        assert_eq!(dynamic[0], 0x85); // FileDirectory
        assert_eq!(dynamic[32], 0xC0); // StreamExtension
        assert_eq!(dynamic[64], 0xC1); // FileName
        assert_eq!(dynamic[96], 0); // rest of the sector is zero-padded
    }
}
