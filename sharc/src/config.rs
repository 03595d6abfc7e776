/// Options for setting up a binary shader archive.
#[derive(Debug, Clone)]
pub struct SetUpConfig {
    /// Resolve native payload offsets during set up. When false the archive is
    /// left endian resolved and can be fixed up later.
    pub resolve_pointers: bool,
}

impl Default for SetUpConfig {
    fn default() -> Self {
        SetUpConfig {
            resolve_pointers: true,
        }
    }
}
