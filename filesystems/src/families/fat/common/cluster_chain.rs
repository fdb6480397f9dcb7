// FAT Cluster Chain Traversal
// Follows FAT links with a hard bound so a looping FAT cannot hang a reader

use fatscope_core::{FsError, FsResult};
use log::warn;
use std::collections::HashSet;

/// Link lookup for a FAT variant.
pub trait FatVariant {
    /// Read the FAT entry for `cluster` (the next link or a marker).
    fn read_fat_entry(&self, cluster: u32) -> FsResult<u32>;

    /// Number of data clusters on the volume.
    fn total_clusters(&self) -> u32;

    /// Check if a FAT value ends a chain
    fn is_end_of_chain(&self, value: u32) -> bool;

    /// Highest addressable data cluster.
    fn max_cluster(&self) -> u32 {
        self.total_clusters() + 1
    }

    /// Check if cluster number is valid
    fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster <= self.max_cluster()
    }
}

/// Iterator over the cluster numbers of one chain, in traversal order.
///
/// Yields an error and stops when the chain links to an invalid cluster,
/// comes back to a cluster it already yielded, or runs longer than the
/// volume has clusters.
pub struct ClusterChain<'a, F: FatVariant + ?Sized> {
    fat: &'a F,
    pending: Option<u32>,
    visited: HashSet<u32>,
    walked: u32,
}

impl<'a, F: FatVariant + ?Sized> ClusterChain<'a, F> {
    pub fn new(fat: &'a F, first_cluster: u32) -> Self {
        Self {
            fat,
            pending: Some(first_cluster),
            visited: HashSet::new(),
            walked: 0,
        }
    }

    /// Clusters yielded so far.
    pub fn walked(&self) -> u32 {
        self.walked
    }
}

impl<'a, F: FatVariant + ?Sized> Iterator for ClusterChain<'a, F> {
    type Item = FsResult<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.pending.take()?;

        if !self.fat.is_valid_cluster(cluster) {
            warn!("Cluster chain links to invalid cluster {:#x}", cluster);
            return Some(Err(FsError::CorruptFilesystem(format!(
                "cluster chain links to invalid cluster {:#x} (valid range 2..={})",
                cluster,
                self.fat.max_cluster()
            ))));
        }

        if !self.visited.insert(cluster) {
            warn!("Cluster chain loops back to cluster {:#x}", cluster);
            return Some(Err(FsError::CorruptFilesystem(format!(
                "circular cluster chain detected at cluster {}",
                cluster
            ))));
        }

        self.walked += 1;
        if self.walked > self.fat.total_clusters() {
            warn!("Cluster chain exceeds {} clusters, FAT has a cycle", self.fat.total_clusters());
            return Some(Err(FsError::CorruptFilesystem(format!(
                "circular cluster chain detected at cluster {}",
                cluster
            ))));
        }

        match self.fat.read_fat_entry(cluster) {
            Ok(next) if self.fat.is_end_of_chain(next) => {}
            Ok(next) => self.pending = Some(next),
            Err(e) => return Some(Err(e)),
        }

        Some(Ok(cluster))
    }
}
