//! The external byte provider a [`crate::config::StaticRegion`] resolves
//! through. Grounded in `original_source/src/vd_virtual_disk.h`'s
//! `vd_file_sector_get_bootrom`/`_sram`/`_flash` externs: the virtual disk
//! never owns BOOTROM/SRAM/FLASH content itself, it only asks an
//! out-of-crate provider to fill a window of bytes on demand.

use crate::error::DispatchError;

/// Fetches `dst.len()` bytes starting at `offset` within the region
/// identified by `region_id` (the same opaque id a [`crate::config::StaticRegion`]
/// or [`crate::config::PartitionTemplate`] carries). Implementors own the
/// actual memory (flash XIP window, SRAM, a `&'static [u8]`, ...); this crate
/// only needs read access to it.
///
/// Returning `Err` degrades the caller to a zero-filled slice rather than
/// propagating past the generator (§7 of the design notes).
pub trait MemoryProvider {
    fn read(&self, region_id: u32, offset: u32, dst: &mut [u8]) -> Result<(), DispatchError>;
}

/// A provider backed by a single in-process byte slice, for tests and for
/// hosts that keep their memory regions as plain `&'static [u8]` (SRAM
/// windows, a linked-in flash image).
pub struct SliceProvider<'a> {
    pub region_id: u32,
    pub bytes: &'a [u8],
}

impl MemoryProvider for SliceProvider<'_> {
    fn read(&self, region_id: u32, offset: u32, dst: &mut [u8]) -> Result<(), DispatchError> {
        if region_id != self.region_id {
            return Err(DispatchError::ExternalFetchFailure(offset));
        }
        let start = offset as usize;
        let end = start + dst.len();
        let Some(src) = self.bytes.get(start..end) else {
            return Err(DispatchError::ExternalFetchFailure(offset));
        };
        dst.copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_provider_reads_within_bounds() {
        let data = [1u8, 2, 3, 4, 5];
        let provider = SliceProvider {
            region_id: 7,
            bytes: &data,
        };
        let mut dst = [0u8; 3];
        provider.read(7, 1, &mut dst).unwrap();
        assert_eq!(dst, [2, 3, 4]);
    }

    #[test]
    fn slice_provider_rejects_wrong_region() {
        let data = [1u8, 2, 3];
        let provider = SliceProvider {
            region_id: 7,
            bytes: &data,
        };
        let mut dst = [0u8; 1];
        assert!(provider.read(8, 0, &mut dst).is_err());
    }

    #[test]
    fn slice_provider_rejects_out_of_bounds_reads() {
        let data = [1u8, 2, 3];
        let provider = SliceProvider {
            region_id: 7,
            bytes: &data,
        };
        let mut dst = [0u8; 4];
        assert!(provider.read(7, 0, &mut dst).is_err());
    }
}
