//! End-to-end structural check: synthesises a whole small volume (boot
//! region, FAT, bitmap, up-case table, root directory, one static file, one
//! dynamic file) and asserts on the resulting bytes at their known offsets —
//! the same style the teacher's own `format::tests::small_format` uses
//! against a real written image, just against a synthesised one instead.

use exfat_vdisk::config::{StaticRegion, VolumeConfigBuilder};
use exfat_vdisk::entry::FileAttributes;
use exfat_vdisk::geometry::Geometry;
use exfat_vdisk::mem::SliceProvider;
use exfat_vdisk::ring::RingBuffer;
use exfat_vdisk::volume::Volume;

static LOG: RingBuffer<256> = RingBuffer::new();

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

#[test]
fn synthesised_volume_has_every_mandatory_structure_at_the_right_offset() {
    let volume_length_sectors = 0x40000000 / 512;
    let geometry = Geometry::derive(512, 8, volume_length_sectors, 1).unwrap();

    let static_name = utf16("A.TXT");
    let mut name = [0u16; 32];
    name[..static_name.len()].copy_from_slice(&static_name);
    let mut static_regions = heapless::Vec::new();
    static_regions
        .push(StaticRegion {
            name,
            name_len: static_name.len() as u8,
            start_cluster: geometry.root_dir_start_cluster + 1,
            length_clusters: 1,
            region_id: 1,
        })
        .unwrap();

    let config = VolumeConfigBuilder::default()
        .volume_length_sectors(volume_length_sectors)
        .static_regions(static_regions)
        .dynamic_area_start_cluster(geometry.root_dir_start_cluster + 2)
        .dynamic_area_end_cluster(geometry.root_dir_start_cluster + 1000)
        .build()
        .unwrap();

    // SliceProvider serves a read only if the whole requested window fits,
    // so the backing bytes need to cover at least one full sector.
    let mut static_file_sector = [0u8; 512];
    static_file_sector[..11].copy_from_slice(b"hello exfat");
    let provider = SliceProvider {
        region_id: 1,
        bytes: &static_file_sector,
    };

    let mut volume: Volume<4, _> = Volume::new(config, provider, 0x1357_9BDF).unwrap();
    volume.set_timestamp(1_700_000_000);

    LOG.write(b"booted\n");
    let dynamic_name = utf16("LOG.TXT");
    volume
        .registry_mut()
        .add(&dynamic_name, 4096, FileAttributes::ARCHIVE, &LOG)
        .unwrap();

    let mut sector = [0u8; 512];

    // Main boot sector.
    volume.read(0, 0, &mut sector);
    assert_eq!(&sector[3..11], b"EXFAT   ");
    assert_eq!(&sector[510..512], &[0x55, 0xAA]);
    assert_eq!(
        u32::from_le_bytes(sector[100..104].try_into().unwrap()),
        0x1357_9BDF
    );
    let main_boot = sector;

    // Backup boot sector is byte-identical to the main copy.
    volume.read(12, 0, &mut sector);
    assert_eq!(sector, main_boot);

    // FAT region: media descriptor, then EOF for every reserved system chain.
    volume.read(geometry.fat_offset, 0, &mut sector);
    assert_eq!(
        u32::from_le_bytes(sector[0..4].try_into().unwrap()),
        0xFFFF_FFF8
    );
    assert_eq!(
        u32::from_le_bytes(sector[4..8].try_into().unwrap()),
        0xFFFF_FFFF
    );

    // Root directory sector 0: label (empty), bitmap, up-case, then the
    // static file's entry set. Static files share the fixed sector; dynamic
    // files never do (§3/§4.6).
    volume.read(geometry.root_dir_first_lba(), 0, &mut sector);
    assert_eq!(sector[0], 0x83); // volume label
    assert_eq!(sector[1], 0); // empty label
    assert_eq!(sector[32], 0x81); // allocation bitmap
    assert_eq!(sector[64], 0x82); // up-case table

    assert_eq!(sector[96], 0x85); // FileDirectory (A.TXT)
    assert_eq!(sector[128], 0xC0); // StreamExtension
    assert_eq!(sector[160], 0xC1); // FileName
    assert_eq!(sector[192], 0); // no second static file, tail is zero

    // Root directory sector 1: LOG.TXT, the first (and only) registered
    // dynamic file, gets its own dedicated sector (slot 0).
    volume.read(geometry.root_dir_first_lba() + 1, 0, &mut sector);
    assert_eq!(sector[0], 0x85); // FileDirectory (LOG.TXT)
    assert_eq!(sector[32], 0xC0); // StreamExtension
    assert_eq!(sector[64], 0xC1); // FileName
    assert_eq!(sector[96], 0); // rest of the sector is zero-padded

    // Static region's own data cluster serves the provider's bytes.
    let static_lba = geometry.cluster_to_lba(geometry.root_dir_start_cluster + 1);
    volume.read(static_lba, 0, &mut sector);
    assert_eq!(sector, static_file_sector);

    // Dynamic file's data cluster serves the ring buffer's bytes.
    let dynamic_lba = geometry.cluster_to_lba(geometry.root_dir_start_cluster + 2);
    volume.read(dynamic_lba, 0, &mut sector);
    assert_eq!(&sector[..7], b"booted\n");
    assert_eq!(LOG.total_written(), 7);
}

#[test]
fn unregistered_reads_past_the_dynamic_area_are_zero() {
    let volume_length_sectors = 0x40000000 / 512;
    let geometry = Geometry::derive(512, 8, volume_length_sectors, 1).unwrap();
    let config = VolumeConfigBuilder::default()
        .volume_length_sectors(volume_length_sectors)
        .dynamic_area_start_cluster(geometry.root_dir_start_cluster + 1)
        .dynamic_area_end_cluster(geometry.root_dir_start_cluster + 1000)
        .build()
        .unwrap();
    let provider = SliceProvider {
        region_id: 0,
        bytes: &[],
    };
    let volume: Volume<4, _> = Volume::new(config, provider, 0).unwrap();

    let mut sector = [0xAAu8; 512];
    let lba = geometry.cluster_to_lba(geometry.root_dir_start_cluster + 500);
    volume.read(lba, 0, &mut sector);
    assert_eq!(sector, [0u8; 512]);
}
