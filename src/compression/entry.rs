/// One node of an archive's directory grammar, as decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    File {
        name: Vec<u8>,
        content: Vec<u8>,
    },
    Directory {
        name: Vec<u8>,
        children: Vec<ArchiveEntry>,
    },
}

impl ArchiveEntry {
    pub fn name(&self) -> &[u8] {
        match self {
            ArchiveEntry::File { name, .. } | ArchiveEntry::Directory { name, .. } => name,
        }
    }

    /// Sum of the content sizes of every file at or below this entry.
    pub fn content_size(&self) -> u64 {
        match self {
            ArchiveEntry::File { content, .. } => content.len() as u64,
            ArchiveEntry::Directory { children, .. } => {
                children.iter().map(ArchiveEntry::content_size).sum()
            }
        }
    }
}
