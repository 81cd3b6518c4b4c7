//! Huffman file and directory archiver.
//!
//! Version 0.1.0
//!
//! Builds one Huffman code table over every byte of every file name and file content given,
//! then writes a self-describing archive: a small header, the code table, and the coded
//! directory tree. Counting and encoding are spread over a rayon worker pool with one task per
//! root input; the archive is byte-identical whatever the number of workers.
//!
//! Basic usage to compress a directory is as follows:
//!
//! `$> archive notes/ todo.txt`
//!
//! This creates notes.compressed next to the inputs, which are left in place.
//! `archive -d notes.compressed` unpacks it again into the current directory.
//!
pub mod bitstream;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod tools;

pub use compression::compress::{compress, encode_bytes, CompressOptions, Estimate, Outcome, Strategy};
pub use compression::decompress::{decode_bytes, decompress, read_archive, read_stream};
pub use compression::Layout;
pub use error::{ArchiveError, Result};
