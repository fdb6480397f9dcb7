pub mod error;
pub mod options;
pub mod partition;

pub use error::{FsError, FsResult};
pub use options::MountOptions;
pub use partition::{BlockPartition, ImagePartition, MemoryPartition, SECTOR_SIZE};
