//! Counting pass over one root input: byte frequencies of every name and every file's content,
//! plus the fixed bits each entry costs, so the final archive size is known before writing it.
//! The directory listing seen here is kept and is exactly what the encoder writes later.

use std::{
    fs,
    ops::Add,
    path::{Path, PathBuf},
};

use log::debug;

use super::archive::{
    check_entry_count, check_name, DIR_ENTRY_BITS, FILE_ENTRY_BITS, MAX_DEPTH,
};
use super::Layout;
use crate::error::{ArchiveError, Result};
use crate::tools::dir_walk::{list_dir, root_name, Excluded};
use crate::tools::freq_count::{freqs, ByteFrequencyTable};

/// One entry as it was found while counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanNode {
    File {
        path: PathBuf,
        name: Vec<u8>,
        /// Content size when counted; encoding fails if the file no longer has it.
        size: u64,
    },
    Directory {
        name: Vec<u8>,
        children: Vec<ScanNode>,
    },
}

/// Everything the counting phase learns about one root input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTally {
    pub freqs: ByteFrequencyTable,
    /// Plaintext bytes in all files.
    pub content_bytes: u64,
    pub files: u64,
    /// Tag, size, name length and child count bits, i.e. everything except coded bytes.
    pub overhead_bits: u64,
    /// Archive layout only. Belongs to a single root, so sums never carry it.
    pub scan: Option<ScanNode>,
}

impl Add<&InputTally> for InputTally {
    type Output = InputTally;
    fn add(mut self, other: &InputTally) -> InputTally {
        self.freqs += &other.freqs;
        self.content_bytes += other.content_bytes;
        self.files += other.files;
        self.overhead_bits += other.overhead_bits;
        self.scan = None;
        self
    }
}

/// Count one root input for the given layout. `parallel` allows chunked counting of large
/// files; `exclude` is left out of every directory listing.
pub fn tally_root(
    path: &Path,
    layout: Layout,
    parallel: bool,
    exclude: Option<&Excluded>,
) -> Result<InputTally> {
    let mut tally = InputTally::default();
    match layout {
        Layout::Stream => {
            let content = fs::read(path)?;
            tally.freqs = freqs(&content, parallel);
            tally.content_bytes = content.len() as u64;
            tally.files = 1;
        }
        Layout::Archive => {
            let root = Walk { parallel, exclude }.entry(
                path,
                root_name(path)?,
                fs::metadata(path)?.is_dir(),
                0,
                &mut tally,
            )?;
            tally.scan = Some(root);
        }
    }
    debug!(
        "{}: {} files, {} bytes",
        path.display(),
        tally.files,
        tally.content_bytes
    );
    Ok(tally)
}

struct Walk<'a> {
    parallel: bool,
    exclude: Option<&'a Excluded>,
}

impl Walk<'_> {
    fn entry(
        &self,
        path: &Path,
        name: Vec<u8>,
        is_dir: bool,
        depth: usize,
        tally: &mut InputTally,
    ) -> Result<ScanNode> {
        check_name(path, &name)?;
        if depth > MAX_DEPTH {
            return Err(ArchiveError::Layout(format!(
                "{} is nested more than {} levels deep",
                path.display(),
                MAX_DEPTH
            )));
        }
        tally.freqs.add_bytes(&name);
        if is_dir {
            tally.overhead_bits += DIR_ENTRY_BITS;
            let listing = list_dir(path, self.exclude)?;
            check_entry_count(path, listing.len())?;
            let children = listing
                .into_iter()
                .map(|child| self.entry(&child.path, child.name, child.is_dir, depth + 1, tally))
                .collect::<Result<Vec<_>>>()?;
            Ok(ScanNode::Directory { name, children })
        } else {
            let content = fs::read(path)?;
            tally.freqs += &freqs(&content, self.parallel);
            tally.content_bytes += content.len() as u64;
            tally.files += 1;
            tally.overhead_bits += FILE_ENTRY_BITS;
            Ok(ScanNode::File {
                path: path.to_path_buf(),
                name,
                size: content.len() as u64,
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_and_contents_share_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("f"), b"xyz").unwrap();

        let tally = tally_root(&root, Layout::Archive, false, None).unwrap();
        let root_len = root.as_os_str().len() as u64;
        // root name + "f" + "xyz"
        assert_eq!(tally.freqs.total(), root_len + 1 + 3);
        assert_eq!(tally.freqs.get(b'x'), 1);
        assert_eq!(tally.content_bytes, 3);
        assert_eq!(tally.files, 1);
        assert_eq!(tally.overhead_bits, DIR_ENTRY_BITS + FILE_ENTRY_BITS);
        assert_eq!(
            tally.scan,
            Some(ScanNode::Directory {
                name: root_name(&root).unwrap(),
                children: vec![ScanNode::File {
                    path: root.join("f"),
                    name: b"f".to_vec(),
                    size: 3,
                }],
            })
        );
    }

    #[test]
    fn output_inside_the_input_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("d");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("all"), b"abc").unwrap();
        let output = root.join("out.compressed");
        fs::write(&output, b"left over from an earlier run").unwrap();

        let exclude = Excluded::new(&output);
        let tally = tally_root(&root, Layout::Archive, false, exclude.as_ref()).unwrap();
        assert_eq!(tally.files, 1);
        assert_eq!(tally.content_bytes, 3);
        match tally.scan {
            Some(ScanNode::Directory { children, .. }) => assert_eq!(children.len(), 1),
            other => panic!("expected a directory scan, got {:?}", other),
        }
    }

    #[test]
    fn stream_layout_counts_content_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"aaab").unwrap();
        let tally = tally_root(&file, Layout::Stream, true, None).unwrap();
        assert_eq!(tally.freqs.total(), 4);
        assert_eq!(tally.overhead_bits, 0);
        assert!(tally.scan.is_none());
    }

    #[test]
    fn tallies_add_up() {
        let mut a = InputTally::default();
        a.freqs.add_bytes(b"ab");
        a.content_bytes = 2;
        let mut b = InputTally::default();
        b.freqs.add_bytes(b"bc");
        b.files = 1;
        let sum = a + &b;
        assert_eq!(sum.freqs.get(b'b'), 2);
        assert_eq!(sum.content_bytes, 2);
        assert_eq!(sum.files, 1);
    }
}
