#![allow(dead_code)]
use usbd_dragdrop::*;

pub const BLOCK: usize = 512;
pub const FLASH_SIZE: usize = 64 * 1024;

// Classic layout: boot sector, 2 FATs of 3 sectors, 2 root directory sectors
pub const ROOT_DIR_1: u32 = 7;
pub const ROOT_DIR_2: u32 = 8;
pub const STATUS_BLOCK: u32 = 17;
pub const FIRST_DATA: u32 = 41;

pub fn layout() -> DiskLayout {
    DiskLayout {
        bytes_per_sector: BLOCK as u16,
        total_sectors: 1104,
        reserved_sectors: 1,
        num_fats: 2,
        sectors_per_fat: 3,
        root_dir_sectors: 2,
        status_block: None,
    }
    .with_status_block(STATUS_BLOCK)
}

pub struct TestTargetOverride {
    pub flash_init: Option<fn(&mut TestTarget) -> Result<(), FlashError>>,
    pub program_page: Option<fn(&mut TestTarget, u32, &[u8]) -> Result<(), FlashError>>,
}

pub struct TestTarget {
    pub flash: Vec<u8>,
    pub programmed: Vec<u32>,
    pub init_calls: usize,
    pub activity: usize,
    pub refreshes: Vec<u32>,
    overrides: TestTargetOverride,
}

impl TestTarget {
    pub fn new(overrides: Option<TestTargetOverride>) -> Self {
        Self {
            flash: vec![0xff; FLASH_SIZE],
            programmed: Vec::new(),
            init_calls: 0,
            activity: 0,
            refreshes: Vec::new(),
            overrides: overrides.unwrap_or(TestTargetOverride {
                flash_init: None,
                program_page: None,
            }),
        }
    }
}

impl DropTarget for TestTarget {
    const IDLE_TIMEOUT_MS: Option<u32> = Some(1000);

    fn flash_init(&mut self) -> Result<(), FlashError> {
        self.init_calls += 1;
        if let Some(f) = self.overrides.flash_init {
            return f(self);
        }
        Ok(())
    }

    fn program_page(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        if let Some(f) = self.overrides.program_page {
            return f(self, offset, data);
        }

        let from = offset as usize;
        let page = self
            .flash
            .get_mut(from..from + data.len())
            .ok_or(FlashError::Address)?;

        // emulate flash write - set bits to 0 only
        for (m, d) in page.iter_mut().zip(data) {
            *m &= *d;
        }
        self.programmed.push(offset);
        Ok(())
    }

    fn looks_like_firmware(&self, block: &[u8]) -> bool {
        looks_like_cortex_m(block, 0..FLASH_SIZE as u32)
    }

    fn refresh_dynamic(&mut self, block: u32, out: &mut [u8]) {
        self.refreshes.push(block);
        out[..6].copy_from_slice(b"STATUS");
    }

    fn activity(&mut self) {
        self.activity += 1;
    }
}

#[derive(Default)]
pub struct TestLink {
    pub disconnects: usize,
    pub fail: bool,
}

impl HostLink for TestLink {
    type Error = ();

    fn disconnect(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.disconnects += 1;
        Ok(())
    }
}

/// First block of an image: a vector table pointing into flash, then `fill`.
pub fn firmware_block(fill: u8) -> [u8; BLOCK] {
    let mut b = [fill; BLOCK];
    b[0..4].copy_from_slice(&0x2000_4000u32.to_le_bytes());
    b[4..8].copy_from_slice(&0x0000_0101u32.to_le_bytes());
    b[8..12].copy_from_slice(&0x0000_01a1u32.to_le_bytes());
    b[12..16].copy_from_slice(&0x0000_01a3u32.to_le_bytes());
    b
}

/// Image data block, never mistaken for a vector table.
pub fn data_block(fill: u8) -> [u8; BLOCK] {
    let mut b = [fill; BLOCK];
    b[0..4].fill(0);
    b
}

fn dir_record(name: &[u8; 11], attr: u8, size: u32) -> [u8; 32] {
    let mut r = [0u8; 32];
    r[..11].copy_from_slice(name);
    r[11] = attr;
    r[26..28].copy_from_slice(&2u16.to_le_bytes());
    r[28..32].copy_from_slice(&size.to_le_bytes());
    r
}

/// Root directory block with a volume label, a long name fragment and `FIRMWARE.BIN` of `size` bytes.
pub fn dir_block(size: u32) -> [u8; BLOCK] {
    let mut b = [0u8; BLOCK];
    b[0..32].copy_from_slice(&dir_record(b"DAPLINK    ", 0x28, 0));
    b[32..64].copy_from_slice(&dir_record(b"\x41f\0i\0r\0m\0w\0", 0x0f, 0xffff_ffff));
    b[64..96].copy_from_slice(&dir_record(b"FIRMWAREBIN", 0x20, size));
    b
}

pub fn disk<'a>(table: &'a [Sector<'a>]) -> DragDropDisk<'a, TestTarget> {
    disk_with(table, TestTarget::new(None))
}

pub fn disk_with<'a>(table: &'a [Sector<'a>], target: TestTarget) -> DragDropDisk<'a, TestTarget> {
    let mut d = DragDropDisk::new(table, layout(), target);
    d.init();
    d
}
