// FAT16 File Operations
// Whole-file and byte-range reads, and cursor-based file handles

use super::node::File;
use fatscope_core::{BlockPartition, FsError, FsResult};
use log::debug;
use std::io;

impl<'a, P: BlockPartition> File<'a, P> {
    /// Read the whole file.
    ///
    /// The chain always covers whole clusters, so the data is cut back to
    /// the declared size.
    pub fn read_all_bytes(&self) -> FsResult<Vec<u8>> {
        let size = self.size() as usize;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut data = self.fs.fat().read_cluster_chain(self.first_cluster())?;
        if data.len() < size {
            return Err(FsError::CorruptFilesystem(format!(
                "{}: cluster chain holds {} bytes but the entry declares {}",
                self.name(),
                data.len(),
                size
            )));
        }
        data.truncate(size);
        Ok(data)
    }

    /// Read up to `length` bytes starting at `offset`.
    ///
    /// The range is clamped to the file size; an offset at or past the end
    /// yields an empty buffer. Only the clusters covering the range are read.
    pub fn read_bytes(&self, offset: u64, length: usize) -> FsResult<Vec<u8>> {
        let size = self.size() as u64;
        if offset >= size {
            return Ok(Vec::new());
        }
        let length = (length as u64).min(size - offset) as usize;
        if length == 0 {
            return Ok(Vec::new());
        }

        let fat = self.fs.fat();
        let cluster_size = self.fs.geometry().bytes_per_cluster() as u64;
        let start_index = offset / cluster_size;
        let end_index = (offset + length as u64).div_ceil(cluster_size);
        debug!(
            "Reading {} bytes of {} at offset {} (clusters {}..{})",
            length,
            self.name(),
            offset,
            start_index,
            end_index
        );

        let mut chain = fat.cluster_chain(self.first_cluster());
        let mut data = Vec::with_capacity(((end_index - start_index) * cluster_size) as usize);
        for index in 0..end_index {
            let cluster = chain.next().ok_or_else(|| {
                FsError::CorruptFilesystem(format!(
                    "{}: cluster chain ends after {} clusters, size needs {}",
                    self.name(),
                    index,
                    end_index
                ))
            })??;
            if index >= start_index {
                data.extend_from_slice(&fat.read_cluster(cluster)?);
            }
        }

        let start = (offset % cluster_size) as usize;
        data.drain(..start);
        data.truncate(length);
        Ok(data)
    }

    /// Open a handle positioned at the start of the file.
    pub fn open(&self) -> FileAccessor<'_, P> {
        FileAccessor::new(self)
    }
}

/// An open file: a borrowed file plus a read cursor.
pub struct FileAccessor<'a, P: BlockPartition> {
    file: &'a File<'a, P>,
    position: u64,
}

impl<'a, P: BlockPartition> FileAccessor<'a, P> {
    pub fn new(file: &'a File<'a, P>) -> Self {
        Self { file, position: 0 }
    }

    pub fn file(&self) -> &File<'a, P> {
        self.file
    }

    /// Read up to `size` bytes at the cursor and advance past them.
    ///
    /// Returns `Ok(None)` once the cursor has reached the end of the file.
    pub fn read(&mut self, size: usize) -> FsResult<Option<Vec<u8>>> {
        if self.is_eof() {
            return Ok(None);
        }

        let data = self.file.read_bytes(self.position, size)?;
        self.position += data.len() as u64;
        Ok(Some(data))
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        (self.file.size() as u64).saturating_sub(self.position)
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.file.size() as u64
    }

    /// Move the cursor, clamped to the file size. Returns the new position.
    pub fn seek(&mut self, position: u64) -> u64 {
        self.position = position.min(self.file.size() as u64);
        self.position
    }

    /// Release the handle. Nothing is held open underneath.
    pub fn close(self) {}
}

impl<'a, P: BlockPartition> io::Read for FileAccessor<'a, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match FileAccessor::read(self, buf.len()) {
            Ok(Some(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Ok(None) => Ok(0),
            Err(FsError::IoError(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}
