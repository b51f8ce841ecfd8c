use core::fmt;

/// Errors reported by a [`DropTarget`](crate::DropTarget) flash driver.
///
/// Codes are stable so they can be rendered on a status page.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Target could not be prepared for programming (debug port, reset, algorithm load).
    Init = 0x01,
    /// Memory erase function failed.
    Erase = 0x04,
    /// Program memory function failed.
    Program = 0x06,
    /// Programmed memory failed verification.
    Verify = 0x07,
    /// Offset is outside of the target's flash region.
    Address = 0x08,
    /// Something went wrong, but the driver does not know what it was.
    Unknown = 0x0E,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlashError::Init => "flash init failed",
            FlashError::Erase => "flash erase failed",
            FlashError::Program => "flash program failed",
            FlashError::Verify => "flash verify failed",
            FlashError::Address => "flash address out of range",
            FlashError::Unknown => "unknown flash error",
        };
        f.write_str(s)
    }
}

/// Reason an active transfer was abandoned.
///
/// Every variant is fatal for the current drop: the host is disconnected
/// and has to copy the whole file again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// `DropTarget::flash_init()` failed.
    FlashInit(FlashError),
    /// `DropTarget::program_page()` failed at image-relative `offset`.
    FlashProgram {
        /// Image-relative byte offset of the failed page.
        offset: u32,
        /// Error returned by the driver.
        error: FlashError,
    },
    /// No block arrived within `DropTarget::IDLE_TIMEOUT_MS`.
    Timeout,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::FlashInit(e) => write!(f, "target init: {}", e),
            TransferError::FlashProgram { offset, error } => {
                write!(f, "program at {:#010x}: {}", offset, error)
            }
            TransferError::Timeout => f.write_str("transfer timed out"),
        }
    }
}

/// Errors returned from block device calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiskError {
    /// Media is not ready: `init()` was not called, or the last transfer
    /// finished and the host has not been re-enumerated yet.
    NotReady,
    /// Buffer length is not a whole number of blocks.
    Misaligned,
    /// The write killed the active transfer, a disconnect is pending.
    Aborted(TransferError),
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskError::NotReady => f.write_str("media not ready"),
            DiskError::Misaligned => f.write_str("buffer is not block aligned"),
            DiskError::Aborted(e) => write!(f, "transfer aborted: {}", e),
        }
    }
}

impl From<TransferError> for DiskError {
    fn from(e: TransferError) -> Self {
        DiskError::Aborted(e)
    }
}
