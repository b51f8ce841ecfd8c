use log::{debug, error, info, warn};

use crate::dirent::{scan_directory, FileKind, FileMatch};
use crate::error::TransferError;
use crate::layout::DiskLayout;
use crate::target::DropTarget;

/// Phase of a firmware drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferPhase {
    /// Waiting for a block that looks like firmware.
    Idle,
    /// First block is programmed, file size is not known yet.
    Armed,
    /// Programming contiguous blocks, file size is known.
    Active,
    /// All declared bytes are programmed.
    Complete,
    /// Transfer failed and was abandoned.
    Aborted(TransferError),
}

/// What a single block write did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// Block is not part of a transfer.
    Ignored,
    /// Block started a new transfer and was programmed at offset 0.
    Started,
    /// Root directory declared the size of the dropped file.
    SizeAnnounced(u32),
    /// Block was programmed at `offset`.
    Programmed {
        /// Image-relative byte offset.
        offset: u32,
    },
    /// Block is not the next contiguous one and was dropped.
    OutOfOrder,
    /// The last declared byte is programmed.
    Complete {
        /// Bytes programmed, rounded up to whole blocks.
        bytes: u32,
    },
}

/// Snapshot of the transfer bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStatus {
    /// Current phase.
    pub phase: TransferPhase,
    /// First block recognized as firmware.
    pub start_block: u32,
    /// Total bytes to accept, `None` until a directory entry declares it.
    pub expected_bytes: Option<u32>,
    /// Bytes committed to flash.
    pub written_bytes: u32,
    /// Last block programmed, for contiguity checks.
    pub last_block_written: u32,
    /// Kind of the dropped file.
    pub kind: FileKind,
}

impl TransferStatus {
    fn new() -> Self {
        Self {
            phase: TransferPhase::Idle,
            start_block: 0,
            expected_bytes: None,
            written_bytes: 0,
            last_block_written: 0,
            kind: FileKind::Unrecognized,
        }
    }

    /// Returns `true` while blocks are being accepted.
    pub fn in_progress(&self) -> bool {
        matches!(self.phase, TransferPhase::Armed | TransferPhase::Active)
    }

    fn done(&self) -> bool {
        match self.expected_bytes {
            Some(expected) => self.written_bytes >= expected,
            None => false,
        }
    }
}

/// Firmware transfer state machine.
///
/// Watches block writes from the host's filesystem driver, starts a
/// transfer on the first block that looks like firmware, programs every
/// following contiguous block, and finishes once the root directory has
/// declared the file size and that many bytes are written.
///
/// Blocks that are not the next contiguous one are dropped without error,
/// the transfer keeps waiting for the expected block.
#[derive(Clone, Copy, Debug)]
pub struct Transfer {
    status: TransferStatus,
    // file seen in the last root directory write before any data arrived
    announced: Option<FileMatch>,
}

impl Default for Transfer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transfer {
    /// Idle state machine.
    pub fn new() -> Self {
        Self {
            status: TransferStatus::new(),
            announced: None,
        }
    }

    /// Current bookkeeping.
    pub fn status(&self) -> &TransferStatus {
        &self.status
    }

    /// Returns `true` while blocks are being accepted.
    pub fn in_progress(&self) -> bool {
        self.status.in_progress()
    }

    /// Abandon an active transfer. Does nothing if none is in progress.
    pub fn abort(&mut self, reason: TransferError) {
        if self.in_progress() {
            error!("transfer aborted: {}", reason);
            self.status.phase = TransferPhase::Aborted(reason);
        }
    }

    /// Process one block written by the host.
    ///
    /// `data` must be exactly one block. A flash failure aborts the
    /// transfer and is returned as an error.
    pub fn write_block<T: DropTarget>(
        &mut self,
        target: &mut T,
        layout: &DiskLayout,
        block: u32,
        data: &[u8],
    ) -> Result<Progress, TransferError> {
        debug!("block: {}", block);

        let mut progress = Progress::Ignored;

        if !self.in_progress() && target.looks_like_firmware(data) {
            self.start(target, block, data, layout.block_size())?;
            progress = Progress::Started;
        } else {
            if layout.is_root_dir(block) {
                let found = scan_directory(data, T::ACCEPTED_FILES);
                self.announce(found);
                if let Some(m) = found {
                    progress = Progress::SizeAnnounced(m.size);
                }
            }

            if self.in_progress() && block >= self.status.start_block {
                progress = self.next_block(target, block, data, layout.block_size())?;
            }
        }

        if self.in_progress() && self.status.done() {
            info!("transfer complete, {} bytes", self.status.written_bytes);
            self.status.phase = TransferPhase::Complete;
            return Ok(Progress::Complete {
                bytes: self.status.written_bytes,
            });
        }

        Ok(progress)
    }

    fn start<T: DropTarget>(
        &mut self,
        target: &mut T,
        block: u32,
        data: &[u8],
        block_size: u32,
    ) -> Result<(), TransferError> {
        info!("firmware detected at block {}", block);

        self.status = TransferStatus {
            phase: TransferPhase::Armed,
            start_block: block,
            expected_bytes: None,
            written_bytes: 0,
            last_block_written: block,
            kind: FileKind::Binary,
        };
        if let Some(m) = self.announced.take() {
            self.status.expected_bytes = Some(m.size);
            self.status.kind = m.kind;
            self.status.phase = TransferPhase::Active;
        }

        if let Err(e) = target.flash_init() {
            let reason = TransferError::FlashInit(e);
            self.abort(reason);
            return Err(reason);
        }

        self.program(target, 0, data)?;
        self.status.written_bytes = block_size;
        Ok(())
    }

    fn announce(&mut self, found: Option<FileMatch>) {
        match (self.status.phase, found) {
            // only the latest directory contents count before data arrives
            (TransferPhase::Idle, _) => {
                self.announced = found;
            }
            (TransferPhase::Armed | TransferPhase::Active, Some(m)) => {
                debug!("file size: {}", m.size);
                self.status.expected_bytes = Some(m.size);
                self.status.kind = m.kind;
                self.status.phase = TransferPhase::Active;
            }
            _ => {}
        }
    }

    fn next_block<T: DropTarget>(
        &mut self,
        target: &mut T,
        block: u32,
        data: &[u8],
        block_size: u32,
    ) -> Result<Progress, TransferError> {
        if Some(block) != self.status.last_block_written.checked_add(1) {
            warn!(
                "dropping block {}, expected {}",
                block,
                self.status.last_block_written.wrapping_add(1)
            );
            return Ok(Progress::OutOfOrder);
        }

        let offset = (block - self.status.start_block).saturating_mul(block_size);
        self.program(target, offset, data)?;

        self.status.written_bytes = self.status.written_bytes.saturating_add(block_size);
        self.status.last_block_written = block;
        Ok(Progress::Programmed { offset })
    }

    fn program<T: DropTarget>(
        &mut self,
        target: &mut T,
        offset: u32,
        data: &[u8],
    ) -> Result<(), TransferError> {
        debug!("program {} bytes at {:#x}", data.len(), offset);
        target.program_page(offset, data).map_err(|error| {
            let reason = TransferError::FlashProgram { offset, error };
            self.abort(reason);
            reason
        })
    }
}
