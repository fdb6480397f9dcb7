// Filesystem families organization
pub mod families;

pub mod ops;

#[cfg(test)]
pub mod test_helpers;

// Re-export the FAT16 reader
pub use families::fat::fat16::{
    Directory, Fat16Filesystem, Fat16PathResolver, File, FileAccessor, Node, NodeType, RootDirectory,
};
pub use families::fat::common::{FatAttributes, FatDirEntry};

pub use ops::FilesystemInfo;
