// FAT16 tree nodes
// Root directory, subdirectories and files as seen through a mounted volume

use super::filesystem::Fat16Filesystem;
use crate::families::fat::common::FatDirEntry;
use fatscope_core::{BlockPartition, FsError, FsResult};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Kind of node, as reported to a VFS layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    File,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Directory => "directory",
            NodeType::File => "file",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or directory on a mounted volume.
pub enum Node<'a, P: BlockPartition> {
    Root(RootDirectory<'a, P>),
    Directory(Directory<'a, P>),
    File(File<'a, P>),
}

impl<'a, P: BlockPartition> Node<'a, P> {
    pub(crate) fn from_entry(fs: &'a Fat16Filesystem<P>, entry: FatDirEntry) -> Self {
        if entry.is_directory() {
            Node::Directory(Directory::new(fs, entry))
        } else {
            Node::File(File::new(fs, entry))
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Root(_) | Node::Directory(_) => NodeType::Directory,
            Node::File(_) => NodeType::File,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.node_type() == NodeType::Directory
    }

    /// Name of the node. The root directory's name is empty.
    pub fn name(&self) -> &str {
        match self {
            Node::Root(_) => "",
            Node::Directory(dir) => dir.name(),
            Node::File(file) => file.name(),
        }
    }

    /// Size from the directory entry. Always 0 for the root directory.
    pub fn size(&self) -> u32 {
        match self {
            Node::Root(_) => 0,
            Node::Directory(dir) => dir.size(),
            Node::File(file) => file.size(),
        }
    }

    /// The raw directory entry, absent for the root directory.
    pub fn entry(&self) -> Option<&FatDirEntry> {
        match self {
            Node::Root(_) => None,
            Node::Directory(dir) => Some(dir.entry()),
            Node::File(file) => Some(file.entry()),
        }
    }

    /// List a directory-like node.
    pub fn read_entries(&self) -> FsResult<Vec<Node<'a, P>>> {
        match self {
            Node::Root(root) => root.read_entries(),
            Node::Directory(dir) => dir.read_entries(),
            Node::File(file) => Err(FsError::NotADirectory(file.name().to_string())),
        }
    }

    pub fn as_file(&self) -> Option<&File<'a, P>> {
        match self {
            Node::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn into_file(self) -> Option<File<'a, P>> {
        match self {
            Node::File(file) => Some(file),
            _ => None,
        }
    }
}

impl<'a, P: BlockPartition> fmt::Debug for Node<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Root(root) => fmt::Debug::fmt(root, f),
            Node::Directory(dir) => fmt::Debug::fmt(dir, f),
            Node::File(file) => fmt::Debug::fmt(file, f),
        }
    }
}

/// The fixed-size FAT16 root directory. It has no directory entry of its
/// own; its location comes from the volume geometry.
pub struct RootDirectory<'a, P: BlockPartition> {
    fs: &'a Fat16Filesystem<P>,
}

impl<'a, P: BlockPartition> RootDirectory<'a, P> {
    pub(crate) fn new(fs: &'a Fat16Filesystem<P>) -> Self {
        Self { fs }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Directory
    }

    pub fn read_entries(&self) -> FsResult<Vec<Node<'a, P>>> {
        self.fs.read_root_entries()
    }
}

impl<'a, P: BlockPartition> fmt::Debug for RootDirectory<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootDirectory")
    }
}

/// A subdirectory, stored as an ordinary cluster chain.
pub struct Directory<'a, P: BlockPartition> {
    fs: &'a Fat16Filesystem<P>,
    entry: FatDirEntry,
    name: String,
}

impl<'a, P: BlockPartition> Directory<'a, P> {
    fn new(fs: &'a Fat16Filesystem<P>, entry: FatDirEntry) -> Self {
        let name = entry.short_name();
        Self { fs, entry, name }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::Directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.entry.file_size
    }

    pub fn entry(&self) -> &FatDirEntry {
        &self.entry
    }

    pub fn read_entries(&self) -> FsResult<Vec<Node<'a, P>>> {
        let cluster = self.entry.first_cluster();
        // ".." in a first-level subdirectory points at cluster 0, the root
        if cluster == 0 {
            return self.fs.read_root_entries();
        }

        debug!("Reading directory {} from cluster {}", self.name, cluster);
        let data = self.fs.fat().read_cluster_chain(cluster)?;
        self.fs.read_directory_entries(&data)
    }
}

impl<'a, P: BlockPartition> fmt::Debug for Directory<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("name", &self.name)
            .field("first_cluster", &self.entry.first_cluster())
            .finish()
    }
}

/// A regular file. Reading is in `file_ops`.
pub struct File<'a, P: BlockPartition> {
    pub(crate) fs: &'a Fat16Filesystem<P>,
    entry: FatDirEntry,
    name: String,
}

impl<'a, P: BlockPartition> File<'a, P> {
    fn new(fs: &'a Fat16Filesystem<P>, entry: FatDirEntry) -> Self {
        let name = entry.short_name();
        Self { fs, entry, name }
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::File
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, as declared by the directory entry.
    pub fn size(&self) -> u32 {
        self.entry.file_size
    }

    pub fn entry(&self) -> &FatDirEntry {
        &self.entry
    }

    pub fn first_cluster(&self) -> u32 {
        self.entry.first_cluster()
    }
}

impl<'a, P: BlockPartition> fmt::Debug for File<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("size", &self.entry.file_size)
            .field("first_cluster", &self.entry.first_cluster())
            .finish()
    }
}
