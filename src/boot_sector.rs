use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::geometry::Geometry;

/// Mandated `JumpBoot` bytes: a short jump over `boot_code`, plus a `NOP`.
pub const JUMP_BOOT: [u8; 3] = [0xEB, 0x76, 0x90];
/// Mandated `FileSystemName`, padded to 8 bytes with spaces.
pub const FILESYSTEM_NAME: [u8; 8] = *b"EXFAT   ";
/// Halt instruction; fills `boot_code` since this volume never boots.
const BOOT_CODE_FILL: u8 = 0xF4;

/// The Main/Backup Boot Sector structure for an exFAT volume.
/// This structure defines the essential parameters required for the file system.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BootSector {
    /// The jump instruction for CPUs to execute bootstrapping instructions in `boot_code`.
    /// - Must be `0xEB 0x76 0x90` in order (low-order byte first).
    pub jump_boot: [u8; 3],

    /// The name of the file system on the volume.
    /// - Must be `"EXFAT   "` (including three trailing spaces).
    pub filesystem_name: [u8; 8],

    /// Reserved field corresponding to the FAT12/16/32 BIOS Parameter Block.
    /// - Must be all zeroes to prevent misinterpretation by FAT-based systems.
    pub _reserved: [u8; 53],

    /// The sector offset from the beginning of the media to the partition that contains the exFAT volume.
    /// - A value of `0` indicates that this field should be ignored.
    pub partition_offset: u64,

    /// The total size of the exFAT volume in sectors.
    pub volume_length: u64,

    /// The sector offset from the start of the volume to the First FAT.
    pub fat_offset: u32,

    /// The number of sectors occupied by each FAT.
    pub fat_length: u32,

    /// The sector offset from the start of the volume to the Cluster Heap.
    pub cluster_heap_offset: u32,

    /// The number of clusters in the Cluster Heap.
    pub cluster_count: u32,

    /// The cluster index of the first cluster in the root directory.
    pub first_cluster_of_root_directory: u32,

    /// A unique serial number for identifying the volume.
    pub volume_serial_number: u32,

    /// The revision number of the exFAT structures on the volume.
    pub file_system_revision: FileSystemRevision,

    /// A set of flags that indicate file system status. See [`VolumeFlags`]
    pub volume_flags: u16,
    /// The sector size in a power-of-two exponent.
    pub bytes_per_sector_shift: u8,

    /// The number of sectors per cluster in a power-of-two exponent.
    pub sectors_per_cluster_shift: u8,

    /// The number of File Allocation Tables (FATs) in the volume. Always `1`:
    /// this volume never carries a TexFAT second FAT.
    pub number_of_fats: u8,

    /// Extended INT 13h drive number, useful for bootstrapping.
    pub drive_select: u8,

    /// The percentage of allocated clusters in the Cluster Heap.
    /// `0xFF` since this volume's usage doesn't correspond to real allocation.
    pub percent_in_use: u8,

    /// Reserved for future use. Must be set to zero.
    pub _reserved2: [u8; 7],

    /// The bootstrapping code that is executed if the volume is bootable.
    pub boot_code: [u8; 390],

    /// Identifies this sector as a boot sector.
    /// - Must be `0xAA55` to be considered valid.
    pub boot_signature: u16,
}

const _: () = assert!(core::mem::size_of::<BootSector>() == 512);

impl BootSector {
    /// Builds the Main and Backup Boot Sector content, identical in both
    /// copies (§3.1): layout comes from `geometry`, the serial number is the
    /// caller's choice (usually a timestamp, per the teacher's
    /// `VolumeSerialNumber::try_new`).
    pub fn build(geometry: &Geometry, volume_serial_number: u32) -> Self {
        Self {
            jump_boot: JUMP_BOOT,
            filesystem_name: FILESYSTEM_NAME,
            _reserved: [0; 53],
            partition_offset: 0,
            volume_length: geometry.volume_length_sectors,
            fat_offset: geometry.fat_offset,
            fat_length: geometry.fat_length,
            cluster_heap_offset: geometry.cluster_heap_offset,
            cluster_count: geometry.cluster_count,
            first_cluster_of_root_directory: geometry.root_dir_start_cluster,
            volume_serial_number,
            file_system_revision: FileSystemRevision::default(),
            volume_flags: VolumeFlags::empty().bits(),
            bytes_per_sector_shift: geometry.bytes_per_sector_shift,
            sectors_per_cluster_shift: geometry.sectors_per_cluster_shift,
            number_of_fats: 1,
            drive_select: 0x80,
            percent_in_use: 0xFF,
            _reserved2: [0; 7],
            boot_code: [BOOT_CODE_FILL; 390],
            boot_signature: 0xAA55,
        }
    }
}

bitflags! {
    /// A set of flags that indicate file system status.
    #[derive(Copy, Clone, Debug, Default, Ord, PartialOrd, Eq, PartialEq)]
    pub struct VolumeFlags: u16 {
        /// - **Bit 0**: `ActiveFat` (0 = First FAT, 1 = Second FAT used in TexFAT).
        const ACTIVE_FAT = 1 << 0;
        /// - **Bit 1**: `VolumeDirty` (0 = clean, 1 = dirty).
        const VOLUME_DIRTY = 1 << 1;
        /// - **Bit 2**: `MediaFailure` (0 = no failures, 1 = known media failures).
        const MEDIA_FAILURE = 1 << 2;
        /// - **Bit 3**: `ClearToZero` (should be cleared before modifying file system structures).
        const CLEAR_TO_ZERO = 1 << 3;
    }
}

/// Structure representing the file system revision.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FileSystemRevision {
    /// Minor version of the exFAT file system (low-order byte).
    pub vermin: u8,
    /// Major version of the exFAT file system (high-order byte).
    pub vermaj: u8,
}

impl Default for FileSystemRevision {
    fn default() -> Self {
        Self {
            vermin: 0,
            vermaj: 1,
        }
    }
}
