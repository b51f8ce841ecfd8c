use log::{debug, info};

use crate::error::{DiskError, TransferError};
use crate::layout::DiskLayout;
use crate::link::HostLink;
use crate::sectors::{self, Sector};
use crate::target::DropTarget;
use crate::transfer::{Progress, Transfer, TransferStatus};

/// How the last transfer ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Every declared byte was programmed.
    Complete {
        /// Bytes programmed.
        bytes: u32,
    },
    /// Transfer was abandoned.
    Failed(TransferError),
}

/// Virtual mass storage disk that flashes firmware dropped onto it.
///
/// Serves block reads from a sector table and feeds block writes into the
/// firmware [`Transfer`] state machine. Intended to be called from a mass
/// storage class's block device callbacks.
pub struct DragDropDisk<'a, T: DropTarget> {
    table: &'a [Sector<'a>],
    layout: DiskLayout,
    target: T,
    transfer: Transfer,
    ready: bool,
    disconnect: bool,
    idle_ms: u32,
    last_outcome: Option<Outcome>,
}

impl<'a, T: DropTarget> DragDropDisk<'a, T> {
    /// Creates a new disk over a fully built sector `table`.
    ///
    /// The disk is not ready until [`init()`](DragDropDisk::init) is called.
    pub fn new(table: &'a [Sector<'a>], layout: DiskLayout, target: T) -> Self {
        Self {
            table,
            layout,
            target,
            transfer: Transfer::new(),
            ready: false,
            disconnect: false,
            idle_ms: 0,
            last_outcome: None,
        }
    }

    /// Reset the transfer state and mark media ready.
    ///
    /// Call at startup and every time the host (re)connects, e.g. after
    /// a disconnect requested by a finished transfer.
    pub fn init(&mut self) {
        info!(
            "disk: {} blocks of {} bytes",
            self.layout.block_count(),
            self.layout.block_size()
        );
        self.transfer = Transfer::new();
        self.disconnect = false;
        self.idle_ms = 0;
        self.ready = true;
    }

    /// Disk geometry.
    pub fn layout(&self) -> &DiskLayout {
        &self.layout
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u32 {
        self.layout.block_size()
    }

    /// Number of blocks.
    pub fn block_count(&self) -> u32 {
        self.layout.block_count()
    }

    /// Disk size in bytes.
    pub fn memory_size(&self) -> u64 {
        self.layout.memory_size()
    }

    /// Returns `true` if reads and writes are served.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Current transfer bookkeeping.
    pub fn transfer(&self) -> &TransferStatus {
        self.transfer.status()
    }

    /// How the most recent transfer ended, survives `init()`.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Returns `true` if a transfer ended and the host must be disconnected.
    pub fn disconnect_pending(&self) -> bool {
        self.disconnect
    }

    /// Reference to the target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Mutable reference to the target.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Read blocks starting at `block`. `buf` must hold a whole number of blocks.
    ///
    /// If media is not ready, `buf` is zeroed and `NotReady` is returned.
    pub fn read(&mut self, block: u32, buf: &mut [u8]) -> Result<(), DiskError> {
        let bs = self.block_size() as usize;
        if bs == 0 || buf.len() % bs != 0 {
            return Err(DiskError::Misaligned);
        }
        if !self.ready {
            buf.fill(0);
            return Err(DiskError::NotReady);
        }

        self.target.activity();

        for (i, out) in buf.chunks_exact_mut(bs).enumerate() {
            let Some(b) = block.checked_add(i as u32) else {
                // past the last addressable block
                out.fill(0);
                continue;
            };
            sectors::serve(self.table, b as u64 * bs as u64, out);

            if self.layout.status_block == Some(b) {
                self.target.refresh_dynamic(b, out);
            }
        }

        Ok(())
    }

    /// Write blocks starting at `block`. `data` must hold a whole number of blocks.
    ///
    /// Blocks are processed in order. Once the transfer completes or fails,
    /// the rest of `data` is ignored and a disconnect is requested.
    pub fn write(&mut self, block: u32, data: &[u8]) -> Result<(), DiskError> {
        let bs = self.block_size() as usize;
        if bs == 0 || data.len() % bs != 0 {
            return Err(DiskError::Misaligned);
        }
        if !self.ready {
            return Err(DiskError::NotReady);
        }

        self.target.activity();
        self.idle_ms = 0;

        for (i, chunk) in data.chunks_exact(bs).enumerate() {
            let Some(b) = block.checked_add(i as u32) else {
                break;
            };
            match self
                .transfer
                .write_block(&mut self.target, &self.layout, b, chunk)
            {
                Ok(Progress::Complete { bytes }) => {
                    self.finish(Outcome::Complete { bytes });
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finish(Outcome::Failed(e));
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Advance the idle timer by `elapsed_ms`.
    ///
    /// Aborts an active transfer once [`DropTarget::IDLE_TIMEOUT_MS`]
    /// passes without a block write.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<(), DiskError> {
        let limit = match T::IDLE_TIMEOUT_MS {
            Some(limit) if self.ready && self.transfer.in_progress() => limit,
            _ => return Ok(()),
        };

        self.idle_ms = self.idle_ms.saturating_add(elapsed_ms);
        if self.idle_ms < limit {
            return Ok(());
        }

        self.transfer.abort(TransferError::Timeout);
        self.finish(Outcome::Failed(TransferError::Timeout));
        Err(TransferError::Timeout.into())
    }

    /// Deliver a pending disconnect to the host.
    ///
    /// Call from the main loop, outside of the USB stack's poll. Returns
    /// `true` if the link was reset. On error the request stays pending.
    pub fn service<L: HostLink>(&mut self, link: &mut L) -> Result<bool, L::Error> {
        if !self.disconnect {
            return Ok(false);
        }

        debug!("disconnecting host");
        link.disconnect()?;
        self.disconnect = false;
        Ok(true)
    }

    fn finish(&mut self, outcome: Outcome) {
        self.ready = false;
        self.disconnect = true;
        self.last_outcome = Some(outcome);
    }
}
