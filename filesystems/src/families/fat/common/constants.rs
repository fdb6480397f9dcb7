// FAT on-disk constants used by the FAT16 reader

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_SEC_PER_TRK: usize = 0x18;
pub const BPB_NUM_HEADS: usize = 0x1A;
pub const BPB_HIDD_SEC: usize = 0x1C;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT16 extended BPB offsets (start at 36)
pub const BS16_DRV_NUM: usize = 0x24;
pub const BS16_RESERVED1: usize = 0x25;
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_ID: usize = 0x27;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

/// Bytes of sector 0 covered by the BPB and FAT16 EBPB.
pub const BPB_REGION_LEN: usize = 0x3E;

// Directory entry layout
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_NAME: usize = 0x00;
pub const DIR_ATTR: usize = 0x0B;
pub const DIR_NT_RES: usize = 0x0C;
pub const DIR_CRT_TIME_TENTH: usize = 0x0D;
pub const DIR_CRT_TIME: usize = 0x0E;
pub const DIR_CRT_DATE: usize = 0x10;
pub const DIR_LST_ACC_DATE: usize = 0x12;
pub const DIR_FST_CLUS_HI: usize = 0x14;
pub const DIR_WRT_TIME: usize = 0x16;
pub const DIR_WRT_DATE: usize = 0x18;
pub const DIR_FST_CLUS_LO: usize = 0x1A;
pub const DIR_FILE_SIZE: usize = 0x1C;

// Directory entry first-byte markers
pub const DIR_ENTRY_END: u8 = 0x00;
pub const DIR_ENTRY_DELETED: u8 = 0xE5;
pub const DIR_ENTRY_KANJI_E5: u8 = 0x05;

// FAT16 entry values
pub const FAT16_ENTRY_SIZE: u32 = 2;
pub const FAT16_FIRST_CLUSTER: u32 = 2;
pub const FAT16_EOC_MIN: u16 = 0xFFF7; // 0xFFF7 (bad) and above end a chain

// Standard values
pub const STANDARD_BYTES_PER_SECTOR: u16 = 512;
