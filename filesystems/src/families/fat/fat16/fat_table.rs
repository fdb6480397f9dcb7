// FAT16 table access
// Cluster-to-sector mapping and chain navigation with a lazy FAT sector cache

use super::boot_sector::Geometry;
use crate::families::fat::common::{ClusterChain, FatVariant, FAT16_ENTRY_SIZE, FAT16_EOC_MIN};
use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::{BlockPartition, FsError, FsResult, SECTOR_SIZE};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::HashMap;

/// Owns the partition and follows cluster chains through one FAT copy.
///
/// FAT sectors are cached by index on first use and never evicted. The
/// volume is read-only, so a cached sector cannot go stale.
pub struct FatTable<P: BlockPartition> {
    partition: RefCell<P>,
    geometry: Geometry,
    fat_start_sector: u32,
    sectors: RefCell<HashMap<u32, Vec<u8>>>,
}

impl<P: BlockPartition> FatTable<P> {
    /// `fat_copy` selects the FAT mirror to read (0 is the primary FAT).
    pub fn new(partition: P, geometry: Geometry, fat_copy: u8) -> FsResult<Self> {
        if fat_copy as u32 >= geometry.num_fats {
            return Err(FsError::InvalidInput(format!(
                "FAT copy {} requested but the volume has {} FATs",
                fat_copy, geometry.num_fats
            )));
        }

        Ok(Self {
            partition: RefCell::new(partition),
            geometry,
            fat_start_sector: geometry.first_fat_sector + fat_copy as u32 * geometry.sectors_per_fat,
            sectors: RefCell::new(HashMap::new()),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Get next cluster from FAT (the raw 16-bit entry, markers included)
    pub fn next_cluster(&self, cluster: u32) -> FsResult<u16> {
        let offset = cluster as u64 * FAT16_ENTRY_SIZE as u64;
        let within = (offset & (SECTOR_SIZE as u64 - 1)) as usize;

        if offset / SECTOR_SIZE as u64 >= self.geometry.sectors_per_fat as u64 {
            return Err(FsError::CorruptFilesystem(format!(
                "cluster {} lies outside the FAT ({} sectors)",
                cluster, self.geometry.sectors_per_fat
            )));
        }
        let sector_index = (offset / SECTOR_SIZE as u64) as u32;

        if let Some(sector) = self.sectors.borrow().get(&sector_index) {
            return Ok(LittleEndian::read_u16(&sector[within..]));
        }

        trace!("Caching FAT sector {}", sector_index);
        let sector = self.read_sectors(self.fat_start_sector as u64 + sector_index as u64, 1)?;
        let next = LittleEndian::read_u16(&sector[within..]);
        self.sectors.borrow_mut().insert(sector_index, sector);
        Ok(next)
    }

    /// Read a cluster
    pub fn read_cluster(&self, cluster: u32) -> FsResult<Vec<u8>> {
        if !self.is_valid_cluster(cluster) {
            return Err(FsError::CorruptFilesystem(format!(
                "invalid cluster: {} (valid range 2..={})",
                cluster,
                self.max_cluster()
            )));
        }

        let sector = self.geometry.cluster_to_sector(cluster);
        self.read_sectors(sector, self.geometry.sectors_per_cluster as usize)
    }

    /// Walk the chain starting at `first_cluster`, one cluster number at a time.
    pub fn cluster_chain(&self, first_cluster: u32) -> ClusterChain<'_, Self> {
        ClusterChain::new(self, first_cluster)
    }

    /// Read cluster chain
    ///
    /// The chain is walked through the FAT first, so a cyclic chain fails
    /// before any data cluster is read.
    pub fn read_cluster_chain(&self, first_cluster: u32) -> FsResult<Vec<u8>> {
        let clusters = self
            .cluster_chain(first_cluster)
            .collect::<FsResult<Vec<u32>>>()?;
        debug!(
            "Reading cluster chain from {} ({} clusters)",
            first_cluster,
            clusters.len()
        );

        let mut data = Vec::with_capacity(clusters.len() * self.geometry.bytes_per_cluster() as usize);
        for cluster in clusters {
            data.extend_from_slice(&self.read_cluster(cluster)?);
        }
        Ok(data)
    }

    /// Number of FAT sectors held in the cache.
    pub fn cached_sector_count(&self) -> usize {
        self.sectors.borrow().len()
    }

    pub(crate) fn read_sectors(&self, sector: u64, count: usize) -> FsResult<Vec<u8>> {
        let data = self.partition.borrow_mut().read_sectors(sector, count)?;
        if data.len() != count * SECTOR_SIZE {
            return Err(FsError::Partition(format!(
                "partition returned {} bytes for {} sectors at {}",
                data.len(),
                count,
                sector
            )));
        }
        Ok(data)
    }
}

impl<P: BlockPartition> FatVariant for FatTable<P> {
    fn read_fat_entry(&self, cluster: u32) -> FsResult<u32> {
        self.next_cluster(cluster).map(u32::from)
    }

    fn total_clusters(&self) -> u32 {
        self.geometry.total_clusters
    }

    fn is_end_of_chain(&self, value: u32) -> bool {
        value >= FAT16_EOC_MIN as u32
    }
}
