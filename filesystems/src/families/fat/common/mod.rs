// Common FAT filesystem components
// On-disk constants, directory entry decoding and cluster chain traversal

pub mod constants;
pub mod structures;
pub mod cluster_chain;

pub use constants::*;
pub use structures::*;
pub use cluster_chain::*;
