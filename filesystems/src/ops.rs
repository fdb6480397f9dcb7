// Filesystem information shared with front ends

use serde::Serialize;

/// Volume summary, as shown by `fatscope info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemInfo {
    pub fs_type: String,
    pub label: Option<String>,
    pub volume_serial: u32,
    pub oem_name: String,
    pub total_bytes: u64,
    pub cluster_size: u32,
    pub total_clusters: u32,
}
