// FAT16 Path Resolver
// Handles path resolution and directory traversal for FAT16 filesystems

use super::filesystem::Fat16Filesystem;
use super::node::Node;
use fatscope_core::{BlockPartition, FsError, FsResult};
use log::{debug, trace};

pub struct Fat16PathResolver<'a, P: BlockPartition> {
    fs: &'a Fat16Filesystem<P>,
}

impl<'a, P: BlockPartition> Fat16PathResolver<'a, P> {
    pub fn new(fs: &'a Fat16Filesystem<P>) -> Self {
        Self { fs }
    }

    /// Resolve an absolute path to its node.
    ///
    /// Names compare case-insensitively. Fails with `NotFound` for paths not
    /// starting with "/" or naming nothing, and `NotADirectory` when a
    /// component before the last one is a file.
    pub fn resolve_path(&self, path: &str) -> FsResult<Node<'a, P>> {
        debug!("Resolving FAT16 path: {}", path);

        if path == "/" {
            return Ok(Node::Root(self.fs.root()));
        }
        let relative = path
            .strip_prefix('/')
            .ok_or_else(|| FsError::NotFound(format!("{} (path must be absolute)", path)))?;

        let components: Vec<String> = relative.split('/').map(str::to_lowercase).collect();
        let mut entries = self.fs.read_root_entries()?;

        for (i, component) in components.iter().enumerate() {
            trace!("Resolving component: {}", component);

            let entry = entries
                .into_iter()
                .find(|e| e.name().to_lowercase() == *component)
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;

            if i + 1 == components.len() {
                return Ok(entry);
            }

            entries = match entry {
                Node::Directory(dir) => dir.read_entries()?,
                other => {
                    return Err(FsError::NotADirectory(format!(
                        "'{}' in {}",
                        other.name(),
                        path
                    )))
                }
            };
        }

        Err(FsError::NotFound(path.to_string()))
    }
}

impl<P: BlockPartition> Fat16Filesystem<P> {
    /// Look up a path. `Ok(None)` means no such file; `Err` is reserved for
    /// I/O failures and corruption met on the way.
    pub fn find(&self, path: &str) -> FsResult<Option<Node<'_, P>>> {
        match self.resolve(path) {
            Ok(node) => Ok(Some(node)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up a path, reporting why it did not resolve.
    pub fn resolve(&self, path: &str) -> FsResult<Node<'_, P>> {
        Fat16PathResolver::new(self).resolve_path(path)
    }

    /// List the directory at `path`.
    pub fn list_directory(&self, path: &str) -> FsResult<Vec<Node<'_, P>>> {
        self.resolve(path)?.read_entries()
    }
}
