// Filesystem Families Organization
// Groups related filesystems together for code reuse

pub mod fat;
