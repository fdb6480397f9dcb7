// FAT16 directory decoding
// Turns raw directory data (root region or cluster chain) into entries

use crate::families::fat::common::{FatDirEntry, DIR_ENTRY_DELETED, DIR_ENTRY_END, DIR_ENTRY_SIZE};
use fatscope_core::FsResult;
use log::trace;

/// Decode the file and directory entries held in `data`, in on-disk order.
///
/// Scanning stops at the first slot starting with 0x00. Deleted slots are
/// skipped, as are volume labels, device entries, long-name slots and any
/// slot with the unused attribute bit set. A trailing partial slot is ignored.
pub fn decode_directory(data: &[u8]) -> FsResult<Vec<FatDirEntry>> {
    let mut entries = Vec::new();

    for slot in data.chunks_exact(DIR_ENTRY_SIZE) {
        match slot[0] {
            DIR_ENTRY_END => break,
            DIR_ENTRY_DELETED => continue,
            _ => {}
        }

        let entry = FatDirEntry::parse(slot)?;
        if !entry.attributes.is_filesystem_object() {
            trace!("Skipping slot with attributes {:#04x}", entry.attributes.0);
            continue;
        }
        entries.push(entry);
    }

    Ok(entries)
}
