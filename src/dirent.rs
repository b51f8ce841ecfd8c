use log::{trace, warn};

/// Size of a short-name directory record.
pub const DIR_ENTRY_SIZE: usize = 32;

/// What kind of image a dropped file is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileKind {
    /// Nothing recognized yet.
    Unrecognized,
    /// Raw binary image, programmed as-is from offset 0.
    Binary,
}

/// Maps a 3-byte short-name extension to a [`FileKind`].
///
/// Comparison is byte-exact, list every case variant the hosts produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionRule {
    /// Extension as stored in the directory record, space padded.
    pub extension: [u8; 3],
    /// Kind reported on a match.
    pub kind: FileKind,
}

impl ExtensionRule {
    /// Create a rule.
    pub const fn new(extension: &[u8; 3], kind: FileKind) -> Self {
        Self {
            extension: *extension,
            kind,
        }
    }
}

/// `BIN` and `bin`.
pub const DEFAULT_RULES: &[ExtensionRule] = &[
    ExtensionRule::new(b"BIN", FileKind::Binary),
    ExtensionRule::new(b"bin", FileKind::Binary),
];

/// [`DEFAULT_RULES`] plus temporary names some hosts give a file while copying it:
/// `PAR` (Internet Explorer), `DOW` (macOS), `CRD` (Chrome).
pub const BROWSER_RULES: &[ExtensionRule] = &[
    ExtensionRule::new(b"BIN", FileKind::Binary),
    ExtensionRule::new(b"bin", FileKind::Binary),
    ExtensionRule::new(b"PAR", FileKind::Binary),
    ExtensionRule::new(b"DOW", FileKind::Binary),
    ExtensionRule::new(b"CRD", FileKind::Binary),
];

/// Result of a successful classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileMatch {
    /// Kind of the file.
    pub kind: FileKind,
    /// Declared file size in bytes, never zero.
    pub size: u32,
}

/// Read-only view of a 32-byte short-name directory record.
#[derive(Clone, Copy)]
pub struct DirEntry<'a>(&'a [u8; DIR_ENTRY_SIZE]);

impl<'a> DirEntry<'a> {
    /// Wrap a record. Returns `None` if `raw` is not exactly 32 bytes.
    pub fn new(raw: &'a [u8]) -> Option<Self> {
        raw.try_into().ok().map(DirEntry)
    }

    /// Name part, space padded.
    pub fn name(&self) -> &'a [u8] {
        &self.0[0..8]
    }

    /// Extension part, space padded.
    pub fn extension(&self) -> &'a [u8] {
        &self.0[8..11]
    }

    /// Attribute byte.
    pub fn attributes(&self) -> u8 {
        self.0[11]
    }

    /// First cluster of the file's data.
    pub fn first_cluster(&self) -> u32 {
        let hi = u16::from_le_bytes([self.0[20], self.0[21]]) as u32;
        let lo = u16::from_le_bytes([self.0[26], self.0[27]]) as u32;
        (hi << 16) | lo
    }

    /// Last modification time and date, raw FAT encoding.
    pub fn modified(&self) -> (u16, u16) {
        (
            u16::from_le_bytes([self.0[22], self.0[23]]),
            u16::from_le_bytes([self.0[24], self.0[25]]),
        )
    }

    /// Declared file size in bytes.
    pub fn file_size(&self) -> u32 {
        u32::from_le_bytes([self.0[28], self.0[29], self.0[30], self.0[31]])
    }
}

impl core::fmt::Debug for DirEntry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = core::str::from_utf8(&self.0[..11]).unwrap_or("?");
        let (time, date) = self.modified();
        f.debug_struct("DirEntry")
            .field("name", &name)
            .field("attributes", &self.attributes())
            .field("size", &self.file_size())
            .field("cluster", &self.first_cluster())
            .field("time", &time)
            .field("date", &date)
            .finish()
    }
}

// Deleted entries (0xE5), end-of-directory (0x00) and long file name
// fragments never start with one of these.
fn first_byte_valid(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// Decide whether `entry` names a wanted file.
pub fn classify(entry: &DirEntry<'_>, rules: &[ExtensionRule]) -> Option<FileMatch> {
    if !first_byte_valid(entry.name()[0]) {
        return None;
    }

    let rule = rules.iter().find(|r| r.extension[..] == *entry.extension())?;

    match entry.file_size() {
        0 => {
            // hosts write a zero size placeholder while data is still in flight
            warn!("ignoring zero size entry");
            None
        }
        size => Some(FileMatch {
            kind: rule.kind,
            size,
        }),
    }
}

/// Scan every record of a directory block, return the first wanted file.
pub fn scan_directory(block: &[u8], rules: &[ExtensionRule]) -> Option<FileMatch> {
    block
        .chunks_exact(DIR_ENTRY_SIZE)
        .filter_map(DirEntry::new)
        .find_map(|entry| {
            trace!("dirent {:?}", entry);
            classify(&entry, rules)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &[u8; 11], attr: u8, size: u32) -> [u8; 32] {
        let mut r = [0u8; 32];
        r[..11].copy_from_slice(name);
        r[11] = attr;
        r[26..28].copy_from_slice(&5u16.to_le_bytes());
        r[28..32].copy_from_slice(&size.to_le_bytes());
        r
    }

    #[test]
    fn accepts_listed_extensions() {
        let r = record(b"FIRMWAREBIN", 0x20, 1234);
        let e = DirEntry::new(&r).unwrap();

        assert_eq!(e.first_cluster(), 5);
        assert_eq!(
            classify(&e, DEFAULT_RULES),
            Some(FileMatch {
                kind: FileKind::Binary,
                size: 1234
            })
        );

        let r = record(b"FIRMWAREbin", 0x20, 1);
        assert!(classify(&DirEntry::new(&r).unwrap(), DEFAULT_RULES).is_some());
    }

    #[test]
    fn case_variants_are_not_normalized() {
        let r = record(b"FIRMWAREBiN", 0x20, 1234);
        assert_eq!(classify(&DirEntry::new(&r).unwrap(), DEFAULT_RULES), None);
    }

    #[test]
    fn rejects_bad_first_byte() {
        for first in [0xE5u8, 0x00, b'.', b'_', b'a', 0x41 | 0x80] {
            let mut r = record(b"XIRMWAREBIN", 0x20, 1234);
            r[0] = first;
            assert_eq!(classify(&DirEntry::new(&r).unwrap(), DEFAULT_RULES), None);
        }
    }

    #[test]
    fn zero_size_is_not_a_match() {
        let r = record(b"FIRMWAREBIN", 0x20, 0);
        assert_eq!(classify(&DirEntry::new(&r).unwrap(), DEFAULT_RULES), None);
    }

    #[test]
    fn browser_rules_accept_rename_artifacts() {
        let r = record(b"FIRMWAREPAR", 0x20, 77);
        let e = DirEntry::new(&r).unwrap();

        assert_eq!(classify(&e, DEFAULT_RULES), None);
        assert_eq!(classify(&e, BROWSER_RULES).map(|m| m.size), Some(77));
    }

    #[test]
    fn scan_returns_first_match() {
        let mut block = [0u8; 512];
        block[..32].copy_from_slice(&record(b"MBED       ", 0x28, 0));
        block[32..64].copy_from_slice(&record(b"MBED    HTM", 0x21, 512));
        block[64..96].copy_from_slice(&record(b"EMPTY   BIN", 0x20, 0));
        block[96..128].copy_from_slice(&record(b"FIRST   BIN", 0x20, 100));
        block[128..160].copy_from_slice(&record(b"SECOND  BIN", 0x20, 200));

        assert_eq!(scan_directory(&block, DEFAULT_RULES).map(|m| m.size), Some(100));
        assert_eq!(scan_directory(&block[..96], DEFAULT_RULES), None);
    }

    #[test]
    fn record_fields() {
        let mut r = record(b"FIRMWAREBIN", 0x20, 0x1234_5678);
        r[20..22].copy_from_slice(&1u16.to_le_bytes());
        r[22..24].copy_from_slice(&0x6000u16.to_le_bytes());
        r[24..26].copy_from_slice(&0x5a21u16.to_le_bytes());
        let e = DirEntry::new(&r).unwrap();

        assert_eq!(e.name(), b"FIRMWARE");
        assert_eq!(e.extension(), b"BIN");
        assert_eq!(e.attributes(), 0x20);
        assert_eq!(e.first_cluster(), 0x1_0005);
        assert_eq!(e.modified(), (0x6000, 0x5a21));
        assert_eq!(e.file_size(), 0x1234_5678);
    }

    #[test]
    fn short_record_is_rejected() {
        assert!(DirEntry::new(&[0u8; 31]).is_none());
    }
}
