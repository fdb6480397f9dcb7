// FAT16 boot sector parsing
// Decodes the BPB/EBPB region of sector 0 and derives the volume layout

use crate::families::fat::common::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::{FsError, FsResult, SECTOR_SIZE};
use serde::Serialize;

/// Largest cluster number a FAT16 link can name before the marker range.
const FAT16_MAX_CLUSTER: u32 = 0xFFF6;

/// BIOS Parameter Block plus the FAT16 extended BPB, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosParameterBlock {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors_16: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,

    pub drive_number: u8,
    pub nt_flags: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl BiosParameterBlock {
    /// Decode the BPB from the first sector of a partition.
    ///
    /// Field values are taken as-is. A sector that is not a FAT boot sector
    /// decodes without complaint and only shows up as nonsense geometry,
    /// which `Geometry::validate` is there to catch.
    pub fn parse(sector: &[u8]) -> FsResult<Self> {
        if sector.len() < BPB_REGION_LEN {
            return Err(FsError::InvalidInput(format!(
                "boot sector too short: {} bytes, need {}",
                sector.len(),
                BPB_REGION_LEN
            )));
        }

        let mut jump_boot = [0u8; 3];
        jump_boot.copy_from_slice(&sector[BS_JMP_BOOT..BS_JMP_BOOT + 3]);
        let mut oem_name = [0u8; 8];
        oem_name.copy_from_slice(&sector[BS_OEM_NAME..BS_OEM_NAME + 8]);
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&sector[BS16_VOL_LAB..BS16_VOL_LAB + 11]);
        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&sector[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8]);

        Ok(Self {
            jump_boot,
            oem_name,
            bytes_per_sector: LittleEndian::read_u16(&sector[BPB_BYTES_PER_SEC..]),
            sectors_per_cluster: sector[BPB_SEC_PER_CLUS],
            reserved_sectors: LittleEndian::read_u16(&sector[BPB_RSVD_SEC_CNT..]),
            num_fats: sector[BPB_NUM_FATS],
            root_entries: LittleEndian::read_u16(&sector[BPB_ROOT_ENT_CNT..]),
            total_sectors_16: LittleEndian::read_u16(&sector[BPB_TOT_SEC16..]),
            media_descriptor: sector[BPB_MEDIA],
            sectors_per_fat: LittleEndian::read_u16(&sector[BPB_FAT_SZ16..]),
            sectors_per_track: LittleEndian::read_u16(&sector[BPB_SEC_PER_TRK..]),
            num_heads: LittleEndian::read_u16(&sector[BPB_NUM_HEADS..]),
            hidden_sectors: LittleEndian::read_u32(&sector[BPB_HIDD_SEC..]),
            total_sectors_32: LittleEndian::read_u32(&sector[BPB_TOT_SEC32..]),
            drive_number: sector[BS16_DRV_NUM],
            nt_flags: sector[BS16_RESERVED1],
            boot_signature: sector[BS16_BOOT_SIG],
            volume_id: LittleEndian::read_u32(&sector[BS16_VOL_ID..]),
            volume_label,
            fs_type,
        })
    }

    /// Total sectors: the 16-bit count, or the 32-bit count when that is zero.
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }

    pub fn oem_name(&self) -> String {
        String::from_utf8_lossy(&self.oem_name).trim_end().to_string()
    }

    pub fn fs_type(&self) -> String {
        String::from_utf8_lossy(&self.fs_type).trim_end().to_string()
    }

    /// Volume label from the EBPB, `None` when blank or "NO NAME".
    pub fn volume_label(&self) -> Option<String> {
        let label = String::from_utf8_lossy(&self.volume_label).trim_end().to_string();
        if label.is_empty() || label == "NO NAME" {
            None
        } else {
            Some(label)
        }
    }
}

/// Volume layout derived once from the BPB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub root_entries: u32,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,

    /// First sector of FAT #0.
    pub first_fat_sector: u32,
    /// First sector after the FATs, where the fixed root directory lives.
    pub first_root_dir_sector: u32,
    /// Sectors spanned by the root directory.
    pub root_dir_sectors: u32,
    /// First sector of cluster 2.
    pub first_data_sector: u32,
    pub data_sectors: u32,
    pub total_clusters: u32,
}

impl Geometry {
    pub fn from_bpb(bpb: &BiosParameterBlock) -> Self {
        let bytes_per_sector = bpb.bytes_per_sector as u32;
        let sectors_per_cluster = bpb.sectors_per_cluster as u32;
        let reserved_sectors = bpb.reserved_sectors as u32;
        let num_fats = bpb.num_fats as u32;
        let root_entries = bpb.root_entries as u32;
        let sectors_per_fat = bpb.sectors_per_fat as u32;
        let total_sectors = bpb.total_sectors();

        let root_dir_sectors = (root_entries * DIR_ENTRY_SIZE as u32)
            .checked_add(bytes_per_sector.saturating_sub(1))
            .and_then(|n| n.checked_div(bytes_per_sector))
            .unwrap_or(0);
        let first_fat_sector = reserved_sectors;
        let first_root_dir_sector = reserved_sectors + num_fats * sectors_per_fat;
        let first_data_sector = first_root_dir_sector + root_dir_sectors;
        let data_sectors = total_sectors.saturating_sub(first_data_sector);
        let total_clusters = data_sectors.checked_div(sectors_per_cluster).unwrap_or(0);

        Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            total_sectors,
            sectors_per_fat,
            first_fat_sector,
            first_root_dir_sector,
            root_dir_sectors,
            first_data_sector,
            data_sectors,
            total_clusters,
        }
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.sectors_per_cluster * self.bytes_per_sector
    }

    /// First sector of a data cluster. `cluster` must already be validated.
    pub fn cluster_to_sector(&self, cluster: u32) -> u64 {
        self.first_root_dir_sector as u64
            + self.root_dir_sectors as u64
            + (cluster as u64 - FAT16_FIRST_CLUSTER as u64) * self.sectors_per_cluster as u64
    }

    /// Check that the layout is usable before any field becomes a loop bound
    /// or an offset. `partition_sectors` adds a check against the real size.
    pub fn validate(&self, partition_sectors: Option<u64>) -> FsResult<()> {
        let corrupt = |msg: String| Err(FsError::CorruptFilesystem(msg));

        if self.bytes_per_sector != SECTOR_SIZE as u32 {
            return corrupt(format!(
                "unsupported bytes per sector: {} (expected {})",
                self.bytes_per_sector, SECTOR_SIZE
            ));
        }
        if self.sectors_per_cluster == 0 || !self.sectors_per_cluster.is_power_of_two() {
            return corrupt(format!(
                "sectors per cluster must be a non-zero power of 2, got {}",
                self.sectors_per_cluster
            ));
        }
        if self.num_fats == 0 {
            return corrupt("number of FATs cannot be 0".to_string());
        }
        if self.sectors_per_fat == 0 {
            return corrupt("sectors per FAT cannot be 0".to_string());
        }
        if self.root_entries == 0 {
            return corrupt("root entry count cannot be 0 on FAT16".to_string());
        }
        if self.total_sectors <= self.first_data_sector {
            return corrupt(format!(
                "total sectors {} do not reach past the metadata region ({} sectors)",
                self.total_sectors, self.first_data_sector
            ));
        }
        if self.total_clusters == 0 {
            return corrupt("volume has no data clusters".to_string());
        }
        if self.total_clusters + 1 > FAT16_MAX_CLUSTER {
            return corrupt(format!(
                "{} clusters cannot be addressed by FAT16",
                self.total_clusters
            ));
        }

        let fat_capacity = self.sectors_per_fat * self.bytes_per_sector / FAT16_ENTRY_SIZE;
        if fat_capacity < self.total_clusters + FAT16_FIRST_CLUSTER {
            return corrupt(format!(
                "FAT holds {} entries but the volume has {} clusters",
                fat_capacity, self.total_clusters
            ));
        }

        if let Some(available) = partition_sectors {
            if self.total_sectors as u64 > available {
                return corrupt(format!(
                    "volume claims {} sectors but the partition has {}",
                    self.total_sectors, available
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot_sector() -> Vec<u8> {
        let mut s = vec![0u8; 512];
        s[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        s[3..11].copy_from_slice(b"MSWIN4.1");
        s[BPB_BYTES_PER_SEC..BPB_BYTES_PER_SEC + 2].copy_from_slice(&512u16.to_le_bytes());
        s[BPB_SEC_PER_CLUS] = 4;
        s[BPB_RSVD_SEC_CNT..BPB_RSVD_SEC_CNT + 2].copy_from_slice(&1u16.to_le_bytes());
        s[BPB_NUM_FATS] = 2;
        s[BPB_ROOT_ENT_CNT..BPB_ROOT_ENT_CNT + 2].copy_from_slice(&512u16.to_le_bytes());
        s[BPB_TOT_SEC16..BPB_TOT_SEC16 + 2].copy_from_slice(&0u16.to_le_bytes());
        s[BPB_MEDIA] = 0xF8;
        s[BPB_FAT_SZ16..BPB_FAT_SZ16 + 2].copy_from_slice(&64u16.to_le_bytes());
        s[BPB_SEC_PER_TRK..BPB_SEC_PER_TRK + 2].copy_from_slice(&63u16.to_le_bytes());
        s[BPB_NUM_HEADS..BPB_NUM_HEADS + 2].copy_from_slice(&255u16.to_le_bytes());
        s[BPB_HIDD_SEC..BPB_HIDD_SEC + 4].copy_from_slice(&2048u32.to_le_bytes());
        s[BPB_TOT_SEC32..BPB_TOT_SEC32 + 4].copy_from_slice(&65_536u32.to_le_bytes());
        s[BS16_DRV_NUM] = 0x80;
        s[BS16_BOOT_SIG] = 0x29;
        s[BS16_VOL_ID..BS16_VOL_ID + 4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        s[BS16_VOL_LAB..BS16_VOL_LAB + 11].copy_from_slice(b"TESTVOL    ");
        s[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8].copy_from_slice(b"FAT16   ");
        s
    }

    #[test]
    fn test_parse_all_fields() {
        let bpb = BiosParameterBlock::parse(&boot_sector()).unwrap();
        assert_eq!(bpb.bytes_per_sector, 512);
        assert_eq!(bpb.sectors_per_cluster, 4);
        assert_eq!(bpb.num_fats, 2);
        assert_eq!(bpb.root_entries, 512);
        assert_eq!(bpb.sectors_per_fat, 64);
        assert_eq!(bpb.hidden_sectors, 2048);
        assert_eq!(bpb.total_sectors(), 65_536);
        assert_eq!(bpb.volume_id, 0xDEADBEEF);
        assert_eq!(bpb.oem_name(), "MSWIN4.1");
        assert_eq!(bpb.fs_type(), "FAT16");
        assert_eq!(bpb.volume_label().as_deref(), Some("TESTVOL"));
    }

    #[test]
    fn test_derived_geometry() {
        let bpb = BiosParameterBlock::parse(&boot_sector()).unwrap();
        let geo = Geometry::from_bpb(&bpb);

        assert_eq!(geo.first_fat_sector, 1);
        assert_eq!(geo.first_root_dir_sector, 1 + 2 * 64);
        assert_eq!(geo.root_dir_sectors, 32);
        assert_eq!(geo.first_data_sector, 129 + 32);
        assert_eq!(geo.data_sectors, 65_536 - 161);
        assert_eq!(geo.total_clusters, (65_536 - 161) / 4);
        assert_eq!(geo.bytes_per_cluster(), 2048);
        assert_eq!(geo.cluster_to_sector(2), 161);
        assert_eq!(geo.cluster_to_sector(3), 165);
        geo.validate(Some(65_536)).unwrap();
    }

    #[test]
    fn test_root_dir_sectors_round_up() {
        let mut sector = boot_sector();
        sector[BPB_ROOT_ENT_CNT..BPB_ROOT_ENT_CNT + 2].copy_from_slice(&17u16.to_le_bytes());
        let geo = Geometry::from_bpb(&BiosParameterBlock::parse(&sector).unwrap());
        assert_eq!(geo.root_dir_sectors, 2);
    }

    #[test]
    fn test_garbage_sector_parses_but_fails_validation() {
        let sector = vec![0u8; 512];
        let bpb = BiosParameterBlock::parse(&sector).unwrap();
        let geo = Geometry::from_bpb(&bpb);
        assert_eq!(geo.total_clusters, 0);
        assert!(matches!(geo.validate(None), Err(FsError::CorruptFilesystem(_))));
    }

    #[test]
    fn test_zero_sectors_per_cluster_rejected() {
        let mut sector = boot_sector();
        sector[BPB_SEC_PER_CLUS] = 0;
        let geo = Geometry::from_bpb(&BiosParameterBlock::parse(&sector).unwrap());
        assert!(matches!(geo.validate(None), Err(FsError::CorruptFilesystem(_))));
    }

    #[test]
    fn test_volume_larger_than_partition_rejected() {
        let geo = Geometry::from_bpb(&BiosParameterBlock::parse(&boot_sector()).unwrap());
        assert!(geo.validate(None).is_ok());
        assert!(matches!(geo.validate(Some(1000)), Err(FsError::CorruptFilesystem(_))));
    }

    #[test]
    fn test_short_sector_rejected() {
        assert!(matches!(
            BiosParameterBlock::parse(&[0u8; 40]),
            Err(FsError::InvalidInput(_))
        ));
    }
}
