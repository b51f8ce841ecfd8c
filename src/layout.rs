use core::ops::Range;

const DIR_ENTRY_SIZE: u32 = 32;

/// Geometry of the virtual disk.
///
/// Supplied by whoever builds the sector table. Everything the transfer
/// logic needs to know about the FAT layout (block size, where the root
/// directory lives) is derived from these fields, nothing is compiled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiskLayout {
    /// Bytes per logical sector, also the block size seen by the host.
    pub bytes_per_sector: u16,
    /// Total number of logical sectors on the disk.
    pub total_sectors: u32,
    /// Sectors before the first FAT, usually `1` (the boot sector).
    pub reserved_sectors: u16,
    /// Number of FAT copies.
    pub num_fats: u8,
    /// Sectors occupied by one FAT copy.
    pub sectors_per_fat: u16,
    /// Sectors occupied by the fixed FAT12/16 root directory.
    pub root_dir_sectors: u16,
    /// Block holding time-varying content (status page), refreshed on every read.
    pub status_block: Option<u32>,
}

/// Reasons [`DiskLayout::from_boot_sector`] rejects a boot sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Boot sector is shorter than the BPB.
    Truncated,
    /// Bytes per sector is zero or not a multiple of a directory entry.
    BadSectorSize,
    /// Zero FATs or zero-sized FAT.
    BadFat,
    /// Neither the 16 nor the 32-bit total sectors field is set.
    NoSectors,
}

impl DiskLayout {
    /// Parse FAT12/16 BPB fields from a boot sector.
    pub fn from_boot_sector(boot: &[u8]) -> Result<Self, LayoutError> {
        if boot.len() < 36 {
            return Err(LayoutError::Truncated);
        }

        let le16 = |at: usize| u16::from_le_bytes([boot[at], boot[at + 1]]);

        let bytes_per_sector = le16(11);
        let reserved_sectors = le16(14);
        let num_fats = boot[16];
        let root_entries = le16(17);
        let total_16 = le16(19);
        let sectors_per_fat = le16(22);
        let total_32 = u32::from_le_bytes([boot[32], boot[33], boot[34], boot[35]]);

        if bytes_per_sector == 0 || bytes_per_sector as u32 % DIR_ENTRY_SIZE != 0 {
            return Err(LayoutError::BadSectorSize);
        }
        if num_fats == 0 || sectors_per_fat == 0 {
            return Err(LayoutError::BadFat);
        }

        let total_sectors = if total_16 != 0 {
            total_16 as u32
        } else {
            total_32
        };
        if total_sectors == 0 {
            return Err(LayoutError::NoSectors);
        }

        let root_bytes = root_entries as u32 * DIR_ENTRY_SIZE;
        let root_dir_sectors =
            ((root_bytes + bytes_per_sector as u32 - 1) / bytes_per_sector as u32) as u16;

        Ok(Self {
            bytes_per_sector,
            total_sectors,
            reserved_sectors,
            num_fats,
            sectors_per_fat,
            root_dir_sectors,
            status_block: None,
        })
    }

    /// Mark `block` as dynamic content.
    pub fn with_status_block(mut self, block: u32) -> Self {
        self.status_block = Some(block);
        self
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u32 {
        self.bytes_per_sector as u32
    }

    /// Disk size in bytes.
    pub fn memory_size(&self) -> u64 {
        self.block_size() as u64 * self.total_sectors as u64
    }

    /// Number of addressable blocks.
    pub fn block_count(&self) -> u32 {
        self.total_sectors
    }

    /// Blocks the host writes directory entries of the root directory to.
    pub fn root_dir_blocks(&self) -> Range<u32> {
        let start = self.reserved_sectors as u32 + self.num_fats as u32 * self.sectors_per_fat as u32;
        start..start + self.root_dir_sectors as u32
    }

    /// Returns `true` if `block` is a root directory block.
    pub fn is_root_dir(&self, block: u32) -> bool {
        self.root_dir_blocks().contains(&block)
    }
}
