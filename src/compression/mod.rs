//! The compression module holds both directions of the archive format.
//!
//! Compression happens in the following steps:
//! - Counting: byte frequencies of every name and every file's content, one tally per root input.
//! - Huffman coding: a single code tree and code table for all inputs together.
//! - Header: plaintext size, symbol count, optional password, then the bit-packed code table.
//! - Entries: each root input is serialized on its own and the results are concatenated in
//!   argument order.
//!
//! Decompression is single threaded. It reads the header and code table, rebuilds the code
//! lookup, and then walks the entry grammar (or the single coded stream).
//!

pub mod archive;
pub mod compress;
pub mod decompress;
pub mod entry;
pub mod header;
pub mod tally;

/// Which body follows the code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One file's coded bytes directly after the code table, with a single trailing pad.
    Stream,
    /// Root count followed by self-describing file and directory entries.
    #[default]
    Archive,
}
