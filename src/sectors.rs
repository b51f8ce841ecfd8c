use core::cmp::{max, min};

/// One entry of the virtual sector table.
///
/// Entries are laid out back-to-back from byte 0 of the disk. An entry may
/// occupy more space (`length`) than it has real bytes for (`content`),
/// the remainder reads as zero. An entry with `length == 0` ends the table.
#[derive(Clone, Copy, Debug)]
pub struct Sector<'a> {
    /// Backing bytes, if any.
    pub content: Option<&'a [u8]>,
    /// Bytes of disk space this entry occupies.
    pub length: u32,
}

impl<'a> Sector<'a> {
    /// Table terminator.
    pub const END: Sector<'static> = Sector {
        content: None,
        length: 0,
    };

    /// Entry backed by `content`, padded with zeros up to `length` bytes.
    pub const fn new(content: &'a [u8], length: u32) -> Self {
        Self {
            content: Some(content),
            length,
        }
    }

    /// Entry that reads as `length` zero bytes.
    pub const fn zeroed(length: u32) -> Self {
        Self {
            content: None,
            length,
        }
    }

    /// Returns `true` for the table terminator.
    pub fn is_end(&self) -> bool {
        self.length == 0
    }
}

/// Fill `out` with the disk bytes starting at byte address `addr`.
///
/// Bytes not backed by any entry's real content, including everything past
/// the last entry or the terminator, are zero.
pub fn serve(table: &[Sector<'_>], addr: u64, out: &mut [u8]) {
    out.fill(0);

    let end = addr + out.len() as u64;
    let mut entry_start: u64 = 0;

    for sector in table.iter().take_while(|s| !s.is_end()) {
        if entry_start >= end {
            break;
        }
        let entry_end = entry_start + sector.length as u64;

        match sector.content {
            Some(content) if entry_end > addr => {
                let real_end = entry_start + min(content.len() as u64, sector.length as u64);
                let from = max(addr, entry_start);
                let to = min(end, real_end);

                if from < to {
                    let src = (from - entry_start) as usize;
                    let dst = (from - addr) as usize;
                    let len = (to - from) as usize;
                    out[dst..dst + len].copy_from_slice(&content[src..src + len]);
                }
            }
            _ => {}
        }

        entry_start = entry_end;
    }
}
