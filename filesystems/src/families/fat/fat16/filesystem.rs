// FAT16 filesystem reader
// Mounts a volume from a block partition and owns its geometry and FAT cache

use super::boot_sector::{BiosParameterBlock, Geometry};
use super::directory::decode_directory;
use super::fat_table::FatTable;
use super::node::{Node, RootDirectory};
use crate::ops::FilesystemInfo;
use fatscope_core::{BlockPartition, FsResult, MountOptions};
use log::{debug, info};

/// A mounted, read-only FAT16 volume.
///
/// Nodes and file handles borrow the filesystem. The FAT cache and the
/// partition sit behind `RefCell`s, so the type is meant for use from a
/// single thread.
pub struct Fat16Filesystem<P: BlockPartition> {
    bpb: BiosParameterBlock,
    fat: FatTable<P>,
    options: MountOptions,
}

impl<P: BlockPartition> Fat16Filesystem<P> {
    /// Mount with default options.
    pub fn mount(partition: P) -> FsResult<Self> {
        Self::mount_with_options(partition, MountOptions::default())
    }

    pub fn mount_with_options(mut partition: P, options: MountOptions) -> FsResult<Self> {
        let boot_data = partition.read_sector(0)?;
        let bpb = BiosParameterBlock::parse(&boot_data)?;
        let geometry = Geometry::from_bpb(&bpb);

        let partition_sectors = if options.verify_partition_size {
            Some(partition.sector_count())
        } else {
            None
        };
        geometry.validate(partition_sectors)?;

        info!("FAT16 filesystem details:");
        info!("  Bytes per sector: {}", geometry.bytes_per_sector);
        info!("  Sectors per cluster: {}", geometry.sectors_per_cluster);
        info!("  Root entries: {}", geometry.root_entries);
        info!("  First data sector: {}", geometry.first_data_sector);
        info!("  Total clusters: {}", geometry.total_clusters);

        let fat = FatTable::new(partition, geometry, options.fat_copy)?;
        Ok(Self { bpb, fat, options })
    }

    pub fn bpb(&self) -> &BiosParameterBlock {
        &self.bpb
    }

    pub fn geometry(&self) -> &Geometry {
        self.fat.geometry()
    }

    pub fn fat(&self) -> &FatTable<P> {
        &self.fat
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub fn root(&self) -> RootDirectory<'_, P> {
        RootDirectory::new(self)
    }

    /// Read the fixed root directory region that follows the FATs.
    pub fn read_root_entries(&self) -> FsResult<Vec<Node<'_, P>>> {
        let geometry = self.geometry();
        debug!(
            "Reading root directory at sector {} ({} sectors)",
            geometry.first_root_dir_sector, geometry.root_dir_sectors
        );

        let data = self.fat.read_sectors(
            geometry.first_root_dir_sector as u64,
            geometry.root_dir_sectors as usize,
        )?;
        self.read_directory_entries(&data)
    }

    /// Decode raw directory data into nodes bound to this filesystem.
    pub fn read_directory_entries(&self, data: &[u8]) -> FsResult<Vec<Node<'_, P>>> {
        Ok(decode_directory(data)?
            .into_iter()
            .map(|entry| Node::from_entry(self, entry))
            .collect())
    }

    pub fn info(&self) -> FilesystemInfo {
        let geometry = self.geometry();
        FilesystemInfo {
            fs_type: "FAT16".to_string(),
            label: self.bpb.volume_label(),
            volume_serial: self.bpb.volume_id,
            oem_name: self.bpb.oem_name(),
            total_bytes: geometry.total_clusters as u64 * geometry.bytes_per_cluster() as u64,
            cluster_size: geometry.bytes_per_cluster(),
            total_clusters: geometry.total_clusters,
        }
    }
}
