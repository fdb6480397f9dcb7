// Test helpers for filesystem testing
// Builds small synthetic FAT16 images in memory

use crate::families::fat::common::constants::*;
use fatscope_core::{BlockPartition, FsResult, MemoryPartition, SECTOR_SIZE};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

pub const RESERVED_SECTORS: u32 = 1;
pub const NUM_FATS: u32 = 2;
pub const SECTORS_PER_FAT: u32 = 1;
pub const ROOT_ENTRIES: u32 = 64;
pub const TOTAL_SECTORS: u32 = 200;

pub const ATTR_FILE: u8 = 0x20;
pub const ATTR_DIR: u8 = 0x10;

/// Where a directory entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    Root,
    Cluster(u32),
}

/// Build a raw 32-byte directory entry.
pub fn dir_entry(name: &[u8; 11], attributes: u8, first_cluster: u32, size: u32) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[DIR_NAME..DIR_NAME + 11].copy_from_slice(name);
    raw[DIR_ATTR] = attributes;
    raw[DIR_FST_CLUS_HI..DIR_FST_CLUS_HI + 2].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
    raw[DIR_FST_CLUS_LO..DIR_FST_CLUS_LO + 2].copy_from_slice(&(first_cluster as u16).to_le_bytes());
    raw[DIR_FILE_SIZE..DIR_FILE_SIZE + 4].copy_from_slice(&size.to_le_bytes());
    raw
}

/// Deterministic, position-dependent test content.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Small FAT16 image: 1 reserved sector, 2 FATs of 1 sector, 64 root
/// entries (4 sectors), 200 sectors in total.
pub struct ImageBuilder {
    image: Vec<u8>,
    sectors_per_cluster: u32,
    next_free: u32,
    next_slot: HashMap<Dir, usize>,
    dir_chains: HashMap<u32, Vec<u32>>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_sectors_per_cluster(1)
    }

    pub fn with_sectors_per_cluster(sectors_per_cluster: u32) -> Self {
        let mut image = vec![0u8; TOTAL_SECTORS as usize * SECTOR_SIZE];

        let bs = &mut image[..SECTOR_SIZE];
        bs[BS_JMP_BOOT..BS_JMP_BOOT + 3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        bs[BS_OEM_NAME..BS_OEM_NAME + 8].copy_from_slice(b"FATSCOPE");
        bs[BPB_BYTES_PER_SEC..BPB_BYTES_PER_SEC + 2].copy_from_slice(&512u16.to_le_bytes());
        bs[BPB_SEC_PER_CLUS] = sectors_per_cluster as u8;
        bs[BPB_RSVD_SEC_CNT..BPB_RSVD_SEC_CNT + 2].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
        bs[BPB_NUM_FATS] = NUM_FATS as u8;
        bs[BPB_ROOT_ENT_CNT..BPB_ROOT_ENT_CNT + 2].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
        bs[BPB_TOT_SEC16..BPB_TOT_SEC16 + 2].copy_from_slice(&(TOTAL_SECTORS as u16).to_le_bytes());
        bs[BPB_MEDIA] = 0xF8;
        bs[BPB_FAT_SZ16..BPB_FAT_SZ16 + 2].copy_from_slice(&(SECTORS_PER_FAT as u16).to_le_bytes());
        bs[BS16_BOOT_SIG] = 0x29;
        bs[BS16_VOL_ID..BS16_VOL_ID + 4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        bs[BS16_VOL_LAB..BS16_VOL_LAB + 11].copy_from_slice(b"SYNTHETIC  ");
        bs[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8].copy_from_slice(b"FAT16   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        let mut builder = Self {
            image,
            sectors_per_cluster,
            next_free: 2,
            next_slot: HashMap::new(),
            dir_chains: HashMap::new(),
        };
        builder.set_fat_entry(0, 0xFFF8);
        builder.set_fat_entry(1, 0xFFFF);
        builder
    }

    pub fn first_root_dir_sector(&self) -> u32 {
        RESERVED_SECTORS + NUM_FATS * SECTORS_PER_FAT
    }

    pub fn first_data_sector(&self) -> u32 {
        self.first_root_dir_sector() + ROOT_ENTRIES * 32 / SECTOR_SIZE as u32
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }

    /// Write a FAT entry into every FAT copy.
    pub fn set_fat_entry(&mut self, cluster: u32, value: u16) {
        for fat in 0..NUM_FATS {
            self.set_fat_entry_in_copy(fat, cluster, value);
        }
    }

    pub fn set_fat_entry_in_copy(&mut self, fat: u32, cluster: u32, value: u16) {
        let offset = (RESERVED_SECTORS + fat * SECTORS_PER_FAT) as usize * SECTOR_SIZE
            + cluster as usize * 2;
        self.image[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Allocate `count` consecutive clusters linked into one chain.
    pub fn alloc_chain(&mut self, count: usize) -> Vec<u32> {
        let chain: Vec<u32> = (0..count as u32).map(|i| self.next_free + i).collect();
        self.next_free += count as u32;
        self.link_chain(&chain);
        chain
    }

    /// Link arbitrary clusters in the given order, ending with an EOC marker.
    pub fn link_chain(&mut self, chain: &[u32]) {
        for pair in chain.windows(2) {
            self.set_fat_entry(pair[0], pair[1] as u16);
        }
        if let Some(&last) = chain.last() {
            self.set_fat_entry(last, 0xFFFF);
        }
    }

    pub fn cluster_offset(&self, cluster: u32) -> usize {
        (self.first_data_sector() + (cluster - 2) * self.sectors_per_cluster) as usize * SECTOR_SIZE
    }

    /// Spread `data` over the clusters of `chain`, in chain order.
    pub fn write_chain_data(&mut self, chain: &[u32], data: &[u8]) {
        let cluster_size = self.cluster_size();
        for (cluster, piece) in chain.iter().zip(data.chunks(cluster_size)) {
            let offset = self.cluster_offset(*cluster);
            self.image[offset..offset + piece.len()].copy_from_slice(piece);
        }
    }

    /// Fill a whole cluster with one byte value.
    pub fn fill_cluster(&mut self, cluster: u32, value: u8) {
        let offset = self.cluster_offset(cluster);
        let size = self.cluster_size();
        self.image[offset..offset + size].fill(value);
    }

    /// Append a raw slot to a directory.
    pub fn add_raw_entry(&mut self, dir: Dir, slot: [u8; 32]) {
        let index = *self.next_slot.get(&dir).unwrap_or(&0);
        let offset = match dir {
            Dir::Root => {
                assert!((index as u32) < ROOT_ENTRIES, "root directory full");
                self.first_root_dir_sector() as usize * SECTOR_SIZE + index * 32
            }
            Dir::Cluster(first) => {
                let per_cluster = self.cluster_size() / 32;
                let chain = &self.dir_chains[&first];
                let cluster = chain[index / per_cluster];
                self.cluster_offset(cluster) + (index % per_cluster) * 32
            }
        };
        self.image[offset..offset + 32].copy_from_slice(&slot);
        self.next_slot.insert(dir, index + 1);
    }

    /// Add a file with contents, allocating just enough clusters.
    pub fn add_file(&mut self, dir: Dir, name: &[u8; 11], data: &[u8]) -> Vec<u32> {
        let clusters = data.len().div_ceil(self.cluster_size());
        let chain = self.alloc_chain(clusters);
        self.write_chain_data(&chain, data);
        let first = chain.first().copied().unwrap_or(0);
        self.add_raw_entry(dir, dir_entry(name, ATTR_FILE, first, data.len() as u32));
        chain
    }

    /// Add a subdirectory of `clusters` clusters, with "." and ".." entries.
    pub fn add_dir(&mut self, parent: Dir, name: &[u8; 11], clusters: usize) -> Dir {
        let chain = self.alloc_chain(clusters);
        for &cluster in &chain {
            self.fill_cluster(cluster, 0);
        }
        let first = chain[0];
        self.dir_chains.insert(first, chain);
        self.add_raw_entry(parent, dir_entry(name, ATTR_DIR, first, 0));

        let dir = Dir::Cluster(first);
        let parent_cluster = match parent {
            Dir::Root => 0,
            Dir::Cluster(c) => c,
        };
        self.add_raw_entry(dir, dir_entry(b".          ", ATTR_DIR, first, 0));
        self.add_raw_entry(dir, dir_entry(b"..         ", ATTR_DIR, parent_cluster, 0));
        dir
    }

    pub fn into_image(self) -> Vec<u8> {
        self.image
    }

    pub fn build(self) -> MemoryPartition {
        MemoryPartition::new(self.image)
    }
}

/// Partition wrapper counting read calls, for cache behavior checks.
pub struct CountingPartition {
    inner: MemoryPartition,
    reads: Rc<Cell<usize>>,
}

impl CountingPartition {
    pub fn new(inner: MemoryPartition) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        (Self { inner, reads: reads.clone() }, reads)
    }
}

impl BlockPartition for CountingPartition {
    fn read_sector(&mut self, index: u64) -> FsResult<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_sector(index)
    }

    fn read_sectors(&mut self, index: u64, count: usize) -> FsResult<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_sectors(index, count)
    }

    fn sector_count(&self) -> u64 {
        self.inner.sector_count()
    }
}
