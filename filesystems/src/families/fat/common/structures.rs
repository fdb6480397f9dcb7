// Common FAT directory entry structures
// Raw 32-byte slots decoded field by field with explicit little-endian widths

use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::{FsError, FsResult};
use std::fmt;

// ============================================================================
// Attributes
// ============================================================================

/// FAT Directory Entry Attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatAttributes(pub u8);

impl FatAttributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const DEVICE: u8 = 0x40;
    pub const UNUSED: u8 = 0x80;
    pub const LFN: u8 = 0x0F; // Long filename entry

    /// Bits marking a slot that is not a file or directory.
    /// LFN slots carry VOLUME_ID and fall under this mask too.
    pub const NOT_AN_OBJECT: u8 = Self::VOLUME_ID | Self::DEVICE | Self::UNUSED;

    pub fn is_read_only(&self) -> bool { self.0 & Self::READ_ONLY != 0 }
    pub fn is_hidden(&self) -> bool { self.0 & Self::HIDDEN != 0 }
    pub fn is_system(&self) -> bool { self.0 & Self::SYSTEM != 0 }
    pub fn is_volume_id(&self) -> bool { self.0 & Self::VOLUME_ID != 0 }
    pub fn is_directory(&self) -> bool { self.0 & Self::DIRECTORY != 0 }
    pub fn is_archive(&self) -> bool { self.0 & Self::ARCHIVE != 0 }
    pub fn is_device(&self) -> bool { self.0 & Self::DEVICE != 0 }
    pub fn is_lfn(&self) -> bool { self.0 & 0x3F == Self::LFN }

    pub fn is_filesystem_object(&self) -> bool {
        self.0 & Self::NOT_AN_OBJECT == 0
    }
}

impl fmt::Display for FatAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.is_read_only(), 'R'),
            (self.is_hidden(), 'H'),
            (self.is_system(), 'S'),
            (self.is_volume_id(), 'V'),
            (self.is_directory(), 'D'),
            (self.is_archive(), 'A'),
        ];
        for (set, c) in flags {
            write!(f, "{}", if set { c } else { '-' })?;
        }
        Ok(())
    }
}

// ============================================================================
// Directory Entry
// ============================================================================

/// A decoded 32-byte directory entry.
///
/// Timestamps stay in their packed FAT date/time form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatDirEntry {
    pub raw_name: [u8; 11],
    pub attributes: FatAttributes,
    pub nt_reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub last_access_date: u16,
    pub first_cluster_high: u16,
    pub write_time: u16,
    pub write_date: u16,
    pub first_cluster_low: u16,
    pub file_size: u32,
}

impl FatDirEntry {
    /// Decode one slot. `slot` must hold at least 32 bytes.
    pub fn parse(slot: &[u8]) -> FsResult<Self> {
        if slot.len() < DIR_ENTRY_SIZE {
            return Err(FsError::InvalidInput(format!(
                "directory entry needs {} bytes, got {}",
                DIR_ENTRY_SIZE,
                slot.len()
            )));
        }

        let mut raw_name = [0u8; 11];
        raw_name.copy_from_slice(&slot[DIR_NAME..DIR_NAME + 11]);

        Ok(Self {
            raw_name,
            attributes: FatAttributes(slot[DIR_ATTR]),
            nt_reserved: slot[DIR_NT_RES],
            creation_time_tenth: slot[DIR_CRT_TIME_TENTH],
            creation_time: LittleEndian::read_u16(&slot[DIR_CRT_TIME..]),
            creation_date: LittleEndian::read_u16(&slot[DIR_CRT_DATE..]),
            last_access_date: LittleEndian::read_u16(&slot[DIR_LST_ACC_DATE..]),
            first_cluster_high: LittleEndian::read_u16(&slot[DIR_FST_CLUS_HI..]),
            write_time: LittleEndian::read_u16(&slot[DIR_WRT_TIME..]),
            write_date: LittleEndian::read_u16(&slot[DIR_WRT_DATE..]),
            first_cluster_low: LittleEndian::read_u16(&slot[DIR_FST_CLUS_LO..]),
            file_size: LittleEndian::read_u32(&slot[DIR_FILE_SIZE..]),
        })
    }

    /// First cluster of the entry's chain (high and low halves joined).
    pub fn first_cluster(&self) -> u32 {
        ((self.first_cluster_high as u32) << 16) | (self.first_cluster_low as u32)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }

    /// The 8.3 name, with the extension joined by "." when present.
    pub fn short_name(&self) -> String {
        let mut base: Vec<u8> = self.raw_name[..8].to_vec();
        if base[0] == DIR_ENTRY_KANJI_E5 {
            base[0] = DIR_ENTRY_DELETED;
        }

        let base = latin1_trimmed(&base);
        let ext = latin1_trimmed(&self.raw_name[8..]);
        if ext.is_empty() {
            base
        } else {
            format!("{}.{}", base, ext)
        }
    }

    /// True for the "." and ".." entries of a subdirectory.
    pub fn is_dot_entry(&self) -> bool {
        self.raw_name == *b".          " || self.raw_name == *b"..         "
    }
}

fn latin1_trimmed(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    bytes[..end].iter().map(|&b| b as char).collect()
}
