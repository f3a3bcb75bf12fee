/// Per-invocation settings shared by every archive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Recompute each header checksum while walking an archive (list, append,
    /// update, extract) and reject mismatches.
    pub verify_checksums: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

impl ArchiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}
