//! # exfat-vdisk
//!
//! On-demand exFAT volume synthesiser: exposes a microcontroller's memory
//! (flash-resident files, live sensor readouts, log streams) as a read-only
//! USB mass-storage disk without ever holding a full filesystem image in RAM.
//! Every sector is generated the instant a `READ10` asks for it.
//!
//! ## Usage
//!
//! ```rust
//! use exfat_vdisk::config::VolumeConfigBuilder;
//! use exfat_vdisk::mem::SliceProvider;
//! use exfat_vdisk::volume::Volume;
//!
//! let config = VolumeConfigBuilder::default()
//!     .volume_length_sectors(32 * 1024 * 1024 / 512)
//!     .dynamic_area_start_cluster(10)
//!     .dynamic_area_end_cluster(2000)
//!     .build()
//!     .unwrap();
//!
//! let provider = SliceProvider { region_id: 0, bytes: &[] };
//! let volume: Volume<4, _> = Volume::new(config, provider, 0xDEAD_BEEF).unwrap();
//!
//! let mut sector = [0u8; 512];
//! volume.read(0, 0, &mut sector);
//! assert_eq!(&sector[510..], &[0x55, 0xAA]);
//! ```
//!
//! ## Limitations
//! Read-only by design: there is no write path, and none is planned — every
//! generator degrades unreadable internal state to zeros rather than
//! reporting an I/O error, since a malformed read is always a programming
//! bug, never a transient device fault. `no_std` support is a work in
//! progress; the `std` feature (on by default) is needed for the `tests/`
//! integration suite and any host-side tooling.

pub mod checksum;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod generators;
pub mod geometry;
pub mod log;
pub mod mem;
pub mod registry;
pub mod ring;
#[cfg(feature = "usb")]
pub mod scsi;
pub mod timestamp;
pub mod upcase;
pub mod volume;

mod boot_sector;

pub use boot_sector::BootSector;
pub use config::{VolumeConfig, VolumeConfigBuilder};
pub use error::{ConfigError, DispatchError, RegistryError};
pub use geometry::Geometry;
pub use registry::{DynamicFileContent, Registry};
pub use volume::Volume;
