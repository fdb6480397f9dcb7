// Block partition abstraction
// Sector-addressed read access underneath the filesystem drivers

use crate::{FsError, FsResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

pub const SECTOR_SIZE: usize = 512;

/// Sector-addressed, read-only view of a partition.
///
/// Sector 0 is the first sector of the partition (the boot sector for a FAT
/// volume), not of the underlying disk.
pub trait BlockPartition {
    /// Read one 512-byte sector.
    fn read_sector(&mut self, index: u64) -> FsResult<Vec<u8>>;

    /// Read `count` consecutive sectors, concatenated in sector order.
    fn read_sectors(&mut self, index: u64, count: usize) -> FsResult<Vec<u8>> {
        let mut data = Vec::with_capacity(count * SECTOR_SIZE);
        for i in 0..count as u64 {
            data.extend_from_slice(&self.read_sector(index + i)?);
        }
        Ok(data)
    }

    /// Number of sectors in the partition.
    fn sector_count(&self) -> u64;
}

fn check_range(index: u64, count: usize, sector_count: u64) -> FsResult<()> {
    let end = index.checked_add(count as u64);
    match end {
        Some(end) if end <= sector_count => Ok(()),
        _ => Err(FsError::Partition(format!(
            "sectors {}..+{} out of range (partition has {} sectors)",
            index, count, sector_count
        ))),
    }
}

/// A partition held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryPartition {
    data: Vec<u8>,
}

impl MemoryPartition {
    /// Wrap an image. A trailing partial sector is zero-padded.
    pub fn new(mut data: Vec<u8>) -> Self {
        let rem = data.len() % SECTOR_SIZE;
        if rem != 0 {
            data.resize(data.len() + SECTOR_SIZE - rem, 0);
        }
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BlockPartition for MemoryPartition {
    fn read_sector(&mut self, index: u64) -> FsResult<Vec<u8>> {
        self.read_sectors(index, 1)
    }

    fn read_sectors(&mut self, index: u64, count: usize) -> FsResult<Vec<u8>> {
        check_range(index, count, self.sector_count())?;
        let start = index as usize * SECTOR_SIZE;
        Ok(self.data[start..start + count * SECTOR_SIZE].to_vec())
    }

    fn sector_count(&self) -> u64 {
        (self.data.len() / SECTOR_SIZE) as u64
    }
}

/// A partition backed by a disk image file.
///
/// The partition may start part way into the image (`first_sector`), which
/// is how a volume inside a partitioned disk image is addressed.
#[derive(Debug)]
pub struct ImagePartition {
    file: File,
    first_sector: u64,
    sector_count: u64,
}

impl ImagePartition {
    /// Open an image whose first sector is the volume's boot sector.
    pub fn open<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        Self::open_at(path, 0)
    }

    /// Open a partition beginning at `first_sector` of the image.
    pub fn open_at<P: AsRef<Path>>(path: P, first_sector: u64) -> FsResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let image_sectors = file.metadata()?.len() / SECTOR_SIZE as u64;
        if first_sector >= image_sectors {
            return Err(FsError::InvalidInput(format!(
                "partition start sector {} is beyond the end of {} ({} sectors)",
                first_sector,
                path.display(),
                image_sectors
            )));
        }

        let sector_count = image_sectors - first_sector;
        debug!(
            "Opened image {} at sector {} ({} sectors)",
            path.display(),
            first_sector,
            sector_count
        );

        Ok(Self {
            file,
            first_sector,
            sector_count,
        })
    }

    pub fn first_sector(&self) -> u64 {
        self.first_sector
    }
}

impl BlockPartition for ImagePartition {
    fn read_sector(&mut self, index: u64) -> FsResult<Vec<u8>> {
        self.read_sectors(index, 1)
    }

    fn read_sectors(&mut self, index: u64, count: usize) -> FsResult<Vec<u8>> {
        check_range(index, count, self.sector_count)?;
        let offset = (self.first_sector + index) * SECTOR_SIZE as u64;
        trace!("Reading {} sectors at offset {:#x}", count, offset);

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; count * SECTOR_SIZE];
        self.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }
}
