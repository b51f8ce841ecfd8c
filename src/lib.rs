#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//!
//! Drag-and-drop firmware flashing over a virtual USB mass storage disk.
//!
//! ## About
//!
//! Debug probes and bootloaders often present themselves as a USB drive.
//! Copying a firmware image onto that drive programs it into the target's
//! flash, no host-side tools needed.
//!
//! The disk does not exist as an image in RAM. Reads are answered from a
//! table of sectors (boot sector, FATs, root directory, a few small files)
//! that only stores real content and pads everything else with zeros.
//! Writes are never stored at all: the library watches what the host's
//! filesystem driver writes and
//!
//! * starts a transfer on the first block that looks like firmware,
//! * programs every following contiguous block to flash,
//! * learns the file size from the root directory entry, whether it is
//!   written before, during, or after the file data,
//! * finishes once that many bytes are programmed, and asks for a
//!   disconnect so the drive re-enumerates on the host.
//!
//! This library is the transfer logic only. USB mass storage transport,
//! building the FAT image, and the actual flash driver are not a part of
//! the library and are expected to be provided by the library user.
//!
//! ### Limitations
//!
//! * Blocks that arrive out of order are dropped without error. The
//!   transfer waits for the next contiguous block, which the host may
//!   never send. Hosts usually write file data sequentially.
//!
//! * Only one file per connection is flashed. After a transfer finishes
//!   or fails, the disk ignores writes until [`DragDropDisk::init()`] is
//!   called again.
//!
//! * File extensions are compared byte-exact, see [`DropTarget::ACCEPTED_FILES`].
//!
//! ## Example
//!
//! The example below focuses on [`DragDropDisk`]. Mass storage class setup
//! and the disk image contents are not in the scope of the example.
//!
//! ```
//! use usbd_dragdrop::*;
//!
//! struct MyTarget {
//!     flash: [u8; 4096],
//! }
//!
//! impl DropTarget for MyTarget {
//!     const IDLE_TIMEOUT_MS: Option<u32> = Some(30_000);
//!
//!     fn flash_init(&mut self) -> Result<(), FlashError> {
//!         // Halt the target, load flash algorithm, etc.
//!         Ok(())
//!     }
//!
//!     fn program_page(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
//!         let offset = offset as usize;
//!         let page = self
//!             .flash
//!             .get_mut(offset..offset + data.len())
//!             .ok_or(FlashError::Address)?;
//!         page.copy_from_slice(data);
//!         Ok(())
//!     }
//!
//!     fn looks_like_firmware(&self, block: &[u8]) -> bool {
//!         looks_like_cortex_m(block, 0..4096)
//!     }
//! }
//!
//! static BOOT: [u8; 62] = [0; 62];
//! static TABLE: [Sector; 2] = [Sector::new(&BOOT, 512), Sector::END];
//!
//! let layout = DiskLayout {
//!     bytes_per_sector: 512,
//!     total_sectors: 64,
//!     reserved_sectors: 1,
//!     num_fats: 2,
//!     sectors_per_fat: 1,
//!     root_dir_sectors: 2,
//!     status_block: None,
//! };
//!
//! let mut disk = DragDropDisk::new(&TABLE, layout, MyTarget { flash: [0xff; 4096] });
//! disk.init();
//!
//! // Mass storage class calls these from usb_dev.poll():
//! let mut block = [0u8; 512];
//! disk.read(0, &mut block).ok();
//! disk.write(40, &block).ok();
//!
//! // And the main loop delivers the disconnect when a transfer is over:
//! // disk.service(&mut usb_dev)?;
//! // disk.tick(elapsed_ms).ok();
//! assert!(!disk.disconnect_pending());
//! ```
//!

/// Directory entry parsing and file classification
pub mod dirent;
/// Disk geometry
pub mod layout;
/// Virtual sector table
pub mod sectors;
/// Firmware transfer state machine
pub mod transfer;

mod disk;
mod error;
mod link;
mod target;

#[doc(inline)]
pub use crate::dirent::{ExtensionRule, FileKind};
pub use crate::disk::{DragDropDisk, Outcome};
pub use crate::error::{DiskError, FlashError, TransferError};
#[doc(inline)]
pub use crate::layout::DiskLayout;
pub use crate::link::HostLink;
#[doc(inline)]
pub use crate::sectors::Sector;
pub use crate::target::{looks_like_cortex_m, DropTarget};
#[doc(inline)]
pub use crate::transfer::{Progress, Transfer, TransferPhase, TransferStatus};
