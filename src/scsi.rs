//! USB Mass Storage adapter: implements `usbd_scsi::BlockDevice` over a
//! [`Volume`] and enforces the read-only SCSI semantics the original
//! firmware hand-rolled in its TinyUSB callbacks.
//!
//! The block-read path is grounded on the `ghostfat` crate's
//! `impl BlockDevice for GhostFat` (`other_examples/.../ryankurte-ghostfat`);
//! the sense-code/Unit-Attention handling is a direct port of
//! `original_source/src/vd_usb_msc_cb.c`'s `tud_msc_scsi_pre_cb` /
//! `tud_msc_scsi_cb` / `tud_msc_write10_cb`, generalized from TinyUSB's C
//! callback style into the `usbd_scsi` crate's trait-based one.

use core::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use usbd_scsi::{BlockDevice, BlockDeviceError};

use crate::log::{debug, warn};
use crate::mem::MemoryProvider;
use crate::volume::Volume;

/// Out-of-scope USB-transport collaborator (§1, §4.8): the adapter only
/// decides *when* a hard reset is warranted, never how to drive the
/// transport hardware itself.
pub trait UsbReconnectRequest: Sync {
    /// Request an electrical disconnect of at least 3ms followed by
    /// reconnect, forcing the host to fully re-enumerate the device.
    fn request_reconnect(&self);
}

/// SPC-4 §6.7 sense key/ASC/ASCQ triples this adapter can report. `usbd_scsi`
/// surfaces write attempts and unit-attention polling as plain `Result`s, so
/// unlike the original there's no separate sense-queueing call — the error
/// variant carries the same information `tud_msc_set_sense` would have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiFault {
    /// SCSI_SENSE_DATA_PROTECT / SCSI_ASC_WRITE_PROTECTED: any attempt to
    /// alter the medium (WRITE, MODE SELECT, UNMAP, FORMAT UNIT, BLANK).
    WriteProtected,
    /// SCSI_SENSE_UNIT_ATTENTION / SCSI_ASC_MEDIUM_MAY_HAVE_CHANGED: raised by
    /// [`ScsiDisk::poll_unit_attention`] after [`ScsiDisk::notify_contents_changed`],
    /// paced to at most once per `ua_minimum_delay_ms`.
    MediumMayHaveChanged,
}

/// Wraps a [`Volume`] with the read-only Unit-Attention bookkeeping the
/// SCSI/MSC layer needs. `usbd_scsi`'s `BlockDevice` only covers block I/O;
/// callers still need to surface [`ScsiFault::MediumMayHaveChanged`] to
/// whatever INQUIRY/TEST UNIT READY/READ CAPACITY path their USB stack
/// exposes, via [`Self::poll_unit_attention`].
pub struct ScsiDisk<const MAX_FILES: usize, P: MemoryProvider> {
    volume: Volume<MAX_FILES, P>,
    contents_changed: AtomicBool,
    /// Milliseconds-since-boot of the last reported Unit Attention, or `-1`
    /// if none has ever fired. Paces repeated CHECK CONDITIONs to at most
    /// one per `ua_minimum_delay_ms` (`VolumeConfig::ua_minimum_delay_ms`).
    last_unit_attention_ms: AtomicI64,
    reconnect: Option<&'static dyn UsbReconnectRequest>,
}

impl<const MAX_FILES: usize, P: MemoryProvider> ScsiDisk<MAX_FILES, P> {
    pub fn new(volume: Volume<MAX_FILES, P>) -> Self {
        Self {
            volume,
            contents_changed: AtomicBool::new(false),
            last_unit_attention_ms: AtomicI64::new(-1),
            reconnect: None,
        }
    }

    /// Installs the collaborator [`Self::notify_contents_changed`]'s
    /// `hard_reset` path calls into. Without one, a `hard_reset` request
    /// still raises Unit Attention but cannot drive the USB disconnect.
    pub fn set_reconnect_request(&mut self, reconnect: &'static dyn UsbReconnectRequest) {
        self.reconnect = Some(reconnect);
    }

    pub fn volume(&self) -> &Volume<MAX_FILES, P> {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut Volume<MAX_FILES, P> {
        &mut self.volume
    }

    /// Marks the disk content as changed, matching
    /// `vd_virtual_disk_contents_changed`: the next TEST UNIT READY / READ
    /// CAPACITY will report Unit Attention (subject to
    /// [`Self::poll_unit_attention`]'s pacing), so the host re-reads instead
    /// of trusting its cache. `hard_reset` additionally asks the installed
    /// [`UsbReconnectRequest`] to force full re-enumeration, matching the
    /// original's `hard_reset=true` path.
    pub fn notify_contents_changed(&self, hard_reset: bool) {
        self.contents_changed.store(true, Ordering::Relaxed);
        if hard_reset {
            if let Some(reconnect) = self.reconnect {
                reconnect.request_reconnect();
            }
        }
    }

    /// Call from the TEST UNIT READY / READ CAPACITY path with the current
    /// time in milliseconds since an arbitrary fixed epoch (any monotonic
    /// source works, matching how [`crate::volume::Volume::set_timestamp`]
    /// is fed). Returns `Err(MediumMayHaveChanged)` for the first poll at
    /// least `ua_minimum_delay_ms` after the previous report, then `Ok(())`
    /// until the change flag is set again.
    pub fn poll_unit_attention(&self, now_ms: i64) -> Result<(), ScsiFault> {
        if !self.contents_changed.load(Ordering::Relaxed) {
            return Ok(());
        }

        let last = self.last_unit_attention_ms.load(Ordering::Relaxed);
        let elapsed_enough =
            last < 0 || now_ms.saturating_sub(last) >= self.volume.config().ua_minimum_delay_ms as i64;
        if !elapsed_enough {
            return Ok(());
        }

        self.contents_changed.store(false, Ordering::Relaxed);
        self.last_unit_attention_ms.store(now_ms, Ordering::Relaxed);
        Err(ScsiFault::MediumMayHaveChanged)
    }

    /// Every write-capable SCSI command routes here: WRITE(10/12/16), MODE
    /// SELECT, UNMAP, FORMAT UNIT, BLANK. Always refused.
    pub fn reject_write(&self) -> ScsiFault {
        warn!("rejected write attempt on read-only volume");
        ScsiFault::WriteProtected
    }
}

impl<const MAX_FILES: usize, P: MemoryProvider> BlockDevice for ScsiDisk<MAX_FILES, P> {
    const BLOCK_BYTES: usize = 512;

    fn read_block(&self, lba: u32, block: &mut [u8]) -> Result<(), BlockDeviceError> {
        debug!("read_block lba={}", lba);
        self.volume.read(lba, 0, block);
        Ok(())
    }

    fn write_block(&mut self, lba: u32, _block: &[u8]) -> Result<(), BlockDeviceError> {
        warn!("rejected write_block at lba={}", lba);
        Err(BlockDeviceError::WriteError)
    }

    fn max_lba(&self) -> u32 {
        (self.volume.sector_count() - 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeConfigBuilder;
    use crate::mem::SliceProvider;

    fn disk() -> ScsiDisk<4, SliceProvider<'static>> {
        let config = VolumeConfigBuilder::default()
            .volume_length_sectors(0x1000000 / 512)
            .dynamic_area_start_cluster(10)
            .dynamic_area_end_cluster(2000)
            .build()
            .unwrap();
        let volume = Volume::new(config, SliceProvider { region_id: 0, bytes: &[] }, 1).unwrap();
        ScsiDisk::new(volume)
    }

    #[test]
    fn read_block_zero_carries_the_boot_signature() {
        let disk = disk();
        let mut block = [0u8; 512];
        disk.read_block(0, &mut block).unwrap();
        assert_eq!(block[510], 0x55);
        assert_eq!(block[511], 0xAA);
    }

    #[test]
    fn write_block_is_always_rejected() {
        let mut disk = disk();
        let block = [0u8; 512];
        assert!(disk.write_block(5, &block).is_err());
    }

    #[test]
    fn unit_attention_fires_exactly_once_after_a_change_notification() {
        let disk = disk();
        assert!(disk.poll_unit_attention(0).is_ok());
        disk.notify_contents_changed(false);
        assert_eq!(
            disk.poll_unit_attention(1000),
            Err(ScsiFault::MediumMayHaveChanged)
        );
        assert!(disk.poll_unit_attention(1000).is_ok());
    }

    #[test]
    fn unit_attention_is_paced_by_the_minimum_delay() {
        let disk = disk();
        disk.notify_contents_changed(false);
        assert_eq!(
            disk.poll_unit_attention(0),
            Err(ScsiFault::MediumMayHaveChanged)
        );

        // A second change arrives right away, but polling too soon after the
        // first report must not fire again.
        disk.notify_contents_changed(false);
        assert!(disk.poll_unit_attention(50).is_ok());

        // Once the minimum delay has elapsed, it fires again.
        assert_eq!(
            disk.poll_unit_attention(200),
            Err(ScsiFault::MediumMayHaveChanged)
        );
    }

    #[test]
    fn hard_reset_requests_a_reconnect() {
        struct Recorder(AtomicBool);
        impl UsbReconnectRequest for Recorder {
            fn request_reconnect(&self) {
                self.0.store(true, Ordering::Relaxed);
            }
        }
        static RECORDER: Recorder = Recorder(AtomicBool::new(false));

        let mut disk = disk();
        disk.set_reconnect_request(&RECORDER);
        disk.notify_contents_changed(true);
        assert!(RECORDER.0.load(Ordering::Relaxed));
    }

    #[test]
    fn max_lba_matches_the_configured_volume_length() {
        let disk = disk();
        assert_eq!(disk.max_lba(), (0x1000000 / 512) - 1);
    }
}
