//! The fixed 32-byte directory entry structures (§7 Directory Entries).
//!
//! Unlike the teacher's `dir::entry` module, which still reads entries back
//! off a real device through an unsafe `transmute` (its own `FIXME` notes
//! bytemuck should replace that once available), these structures only ever
//! need to be *produced*: `bytemuck::bytes_of` renders each one into its
//! on-disk form for a generator to splice into a sector.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::checksum::set_checksum;
use crate::timestamp::UTC_OFFSET;

pub const ENTRY_TYPE_END_OF_DIRECTORY: u8 = 0x00;
pub const ENTRY_TYPE_ALLOCATION_BITMAP: u8 = 0x81;
pub const ENTRY_TYPE_UPCASE_TABLE: u8 = 0x82;
pub const ENTRY_TYPE_VOLUME_LABEL: u8 = 0x83;
pub const ENTRY_TYPE_FILE_DIRECTORY: u8 = 0x85;
pub const ENTRY_TYPE_VOLUME_GUID: u8 = 0xA0;
pub const ENTRY_TYPE_STREAM_EXTENSION: u8 = 0xC0;
pub const ENTRY_TYPE_FILE_NAME: u8 = 0xC1;

/// `AllocationPossible | NoFatChain`: every file and the three system chains
/// on this volume are a single contiguous run, so both bits are always set.
pub const SECONDARY_FLAGS_CONTIGUOUS: u8 = 0x03;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct FileAttributes: u16 {
        const READ_ONLY = 1 << 0;
        const HIDDEN = 1 << 1;
        const SYSTEM = 1 << 2;
        const DIRECTORY = 1 << 4;
        const ARCHIVE = 1 << 5;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AllocationBitmapEntry {
    pub entry_type: u8,
    pub bitmap_flags: u8,
    pub _reserved: [u8; 18],
    pub first_cluster: u32,
    pub data_length: u64,
}

impl AllocationBitmapEntry {
    pub fn new(first_cluster: u32, data_length: u64) -> Self {
        Self {
            entry_type: ENTRY_TYPE_ALLOCATION_BITMAP,
            bitmap_flags: 0,
            _reserved: [0; 18],
            first_cluster,
            data_length,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UpcaseTableEntry {
    pub entry_type: u8,
    pub _reserved1: [u8; 3],
    pub table_checksum: u32,
    pub _reserved2: [u8; 12],
    pub first_cluster: u32,
    pub data_length: u64,
}

impl UpcaseTableEntry {
    pub fn new(first_cluster: u32, data_length: u64, table_checksum: u32) -> Self {
        Self {
            entry_type: ENTRY_TYPE_UPCASE_TABLE,
            _reserved1: [0; 3],
            table_checksum,
            _reserved2: [0; 12],
            first_cluster,
            data_length,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VolumeLabelEntry {
    pub entry_type: u8,
    pub character_count: u8,
    pub volume_label: [u16; 11],
    pub _reserved: [u8; 8],
}

impl VolumeLabelEntry {
    /// An empty label (`character_count == 0`) is valid and means "no label".
    pub fn new(label_utf16: &[u16]) -> Self {
        let mut volume_label = [0u16; 11];
        let len = label_utf16.len().min(11);
        volume_label[..len].copy_from_slice(&label_utf16[..len]);
        Self {
            entry_type: ENTRY_TYPE_VOLUME_LABEL,
            character_count: len as u8,
            volume_label,
            _reserved: [0; 8],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FileDirectoryEntry {
    pub entry_type: u8,
    pub secondary_count: u8,
    pub set_checksum: u16,
    pub file_attributes: u16,
    pub _reserved1: u16,
    pub create_timestamp: u32,
    pub last_modified_timestamp: u32,
    pub last_accessed_timestamp: u32,
    pub create_10ms_increment: u8,
    pub last_modified_10ms_increment: u8,
    pub create_utc_offset: u8,
    pub last_modified_utc_offset: u8,
    pub last_accessed_utc_offset: u8,
    pub _reserved2: [u8; 7],
}

impl FileDirectoryEntry {
    pub fn new(secondary_count: u8, attributes: FileAttributes, timestamp: u32) -> Self {
        Self {
            entry_type: ENTRY_TYPE_FILE_DIRECTORY,
            secondary_count,
            set_checksum: 0,
            file_attributes: attributes.bits(),
            _reserved1: 0,
            create_timestamp: timestamp,
            last_modified_timestamp: timestamp,
            last_accessed_timestamp: timestamp,
            create_10ms_increment: 0,
            last_modified_10ms_increment: 0,
            create_utc_offset: UTC_OFFSET,
            last_modified_utc_offset: UTC_OFFSET,
            last_accessed_utc_offset: UTC_OFFSET,
            _reserved2: [0; 7],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StreamExtensionEntry {
    pub entry_type: u8,
    pub general_secondary_flags: u8,
    pub _reserved1: u8,
    pub name_length: u8,
    pub name_hash: u16,
    pub _reserved2: u16,
    pub valid_data_length: u64,
    pub _reserved3: u32,
    pub first_cluster: u32,
    pub data_length: u64,
}

impl StreamExtensionEntry {
    pub fn new(name_length: u8, name_hash: u16, first_cluster: u32, data_length: u64) -> Self {
        Self {
            entry_type: ENTRY_TYPE_STREAM_EXTENSION,
            general_secondary_flags: SECONDARY_FLAGS_CONTIGUOUS,
            _reserved1: 0,
            name_length,
            name_hash,
            _reserved2: 0,
            valid_data_length: data_length,
            _reserved3: 0,
            first_cluster,
            data_length,
        }
    }
}

/// Holds up to 15 UTF-16 code units of a file name; callers pad the tail with
/// zeros when the name is shorter, per §7.7.3.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FileNameEntry {
    pub entry_type: u8,
    pub general_secondary_flags: u8,
    pub file_name: [u16; 15],
}

impl FileNameEntry {
    pub fn new(chunk: &[u16]) -> Self {
        let mut file_name = [0u16; 15];
        let len = chunk.len().min(15);
        file_name[..len].copy_from_slice(&chunk[..len]);
        Self {
            entry_type: ENTRY_TYPE_FILE_NAME,
            general_secondary_flags: 0,
            file_name,
        }
    }
}

/// Splits a name into 15-code-unit chunks, one [`FileNameEntry`] each.
pub fn file_name_entries(name_utf16: &[u16]) -> impl Iterator<Item = FileNameEntry> + '_ {
    name_utf16.chunks(15).map(FileNameEntry::new)
}

/// Computes SetChecksum over an already-assembled entry set and splices it
/// into the primary entry's `set_checksum` field (bytes 2..4).
pub fn finalize_set_checksum(entry_set: &mut [u8]) {
    let sum = set_checksum(entry_set);
    entry_set[2..4].copy_from_slice(&sum.to_le_bytes());
}
