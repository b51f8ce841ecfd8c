use core::ops::Range;

use crate::dirent::{ExtensionRule, DEFAULT_RULES};
use crate::error::FlashError;

/// Trait that describes everything the disk needs from the device it
/// runs on: the target flash driver, the "is this firmware" heuristic,
/// dynamic file content and activity indication.
///
/// [`DragDropDisk`](crate::DragDropDisk) calls these from its `read()` and
/// `write()`, which are usually called from the USB stack's poll, i.e.
/// from USB interrupt context. All of them are expected to block until done.
pub trait DropTarget {
    /// Files that are accepted as firmware images, matched against the
    /// extension of a root directory entry. Default is `BIN` and `bin`.
    ///
    /// See [`BROWSER_RULES`](crate::dirent::BROWSER_RULES) for a wider set.
    const ACCEPTED_FILES: &'static [ExtensionRule] = DEFAULT_RULES;

    /// Abort an active transfer if no block is written for this many
    /// milliseconds, as measured by [`DragDropDisk::tick()`](crate::DragDropDisk::tick).
    /// Default is `None`: wait forever.
    const IDLE_TIMEOUT_MS: Option<u32> = None;

    /// Prepare the target for programming.
    ///
    /// Called once per transfer, just before the first page is programmed.
    fn flash_init(&mut self) -> Result<(), FlashError>;

    /// Program `data` at `offset` bytes from the start of the image.
    ///
    /// `data` is always exactly one block long and `offset` is block aligned.
    /// Implementation is responsible for erasing as needed.
    fn program_page(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Returns `true` if `block` looks like the start of an executable image.
    ///
    /// This starts a transfer, so it should be strict enough not to trigger
    /// on filesystem metadata. See [`looks_like_cortex_m`].
    fn looks_like_firmware(&self, block: &[u8]) -> bool;

    /// Regenerate dynamic content of the status block.
    ///
    /// Called after the static content of `block` was copied to `out`,
    /// whatever is left in `out` is sent to the host.
    fn refresh_dynamic(&mut self, _block: u32, _out: &mut [u8]) {}

    /// Called on every read and write, e.g. to blink a LED.
    fn activity(&mut self) {}
}

/// Checks that `block` starts with a Cortex-M vector table pointing into `flash`.
///
/// Initial stack pointer must be non-zero and word aligned, Reset, NMI and
/// HardFault handlers must lie in `flash`.
pub fn looks_like_cortex_m(block: &[u8], flash: Range<u32>) -> bool {
    if block.len() < 16 {
        return false;
    }

    let word = |i: usize| u32::from_le_bytes([block[i], block[i + 1], block[i + 2], block[i + 3]]);

    let sp = word(0);
    if sp == 0 || sp & 0x3 != 0 {
        return false;
    }

    // Thumb bit is set on handler addresses
    (1..4).all(|i| flash.contains(&(word(i * 4) & !1)))
}
