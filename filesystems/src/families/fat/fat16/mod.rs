// FAT16 module - read-only volume access

pub mod boot_sector;
pub mod fat_table;
pub mod directory;
pub mod node;
pub mod filesystem;
pub mod path_resolver;
pub mod file_ops;


pub use boot_sector::{BiosParameterBlock, Geometry};
pub use fat_table::FatTable;
pub use directory::decode_directory;
pub use node::{Directory, File, Node, NodeType, RootDirectory};
pub use filesystem::Fat16Filesystem;
pub use path_resolver::Fat16PathResolver;
pub use file_ops::FileAccessor;
