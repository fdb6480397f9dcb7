use serde::{Deserialize, Serialize};

/// Options applied when mounting a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountOptions {
    /// Which FAT mirror to follow cluster chains through. 0 is the primary FAT.
    pub fat_copy: u8,
    /// Reject volumes whose BPB claims more sectors than the partition holds.
    pub verify_partition_size: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fat_copy: 0,
            verify_partition_size: true,
        }
    }
}
