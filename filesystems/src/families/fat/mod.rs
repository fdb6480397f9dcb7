// FAT Filesystem Family
// Read-only FAT16 support

pub mod common;
pub mod fat16;
