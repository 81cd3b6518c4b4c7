//! The recursive entry grammar of the archive layout.
//!
//! ```text
//! file      := 1  size:64 (LE)  name  content-codes
//! directory := 0  name  count:16 (LE)  entry*count
//! name      := length:8  name-codes
//! ```
//!
//! Each root level entry is written by its own BitWriter starting at bit 0 and is zero padded at
//! its end, so roots can be encoded independently and simply concatenated.

use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use log::{debug, trace};

use super::entry::ArchiveEntry;
use super::tally::ScanNode;
use crate::bitstream::{bitreader::BitReader, bitwriter::BitWriter};
use crate::error::{ArchiveError, Result, Section};
use crate::huffman_coding::code_table::{CodeBook, CodeTable};
use crate::tools::progress::ProgressTracker;

/// Longest name the one byte length field can describe.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;
/// Most entries a two byte count field can describe.
pub const MAX_ENTRIES: usize = u16::MAX as usize;
/// Deepest directory nesting written or read.
pub const MAX_DEPTH: usize = 256;

/// Fixed bits of a file entry: tag, size, name length.
pub const FILE_ENTRY_BITS: u64 = 1 + 64 + 8;
/// Fixed bits of a directory entry: tag, name length, child count.
pub const DIR_ENTRY_BITS: u64 = 1 + 8 + 16;
/// Bits of the root count that closes the prelude.
pub const ROOT_COUNT_BITS: u64 = 16;

pub(crate) fn check_name(path: &Path, name: &[u8]) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::NameTooLong(path.to_path_buf()));
    }
    Ok(())
}

pub(crate) fn check_entry_count(path: &Path, count: usize) -> Result<()> {
    if count > MAX_ENTRIES {
        return Err(ArchiveError::TooManyEntries(path.to_path_buf()));
    }
    Ok(())
}

/// Put every byte of `data` on the stream as its code.
pub fn write_coded<W: Write>(bw: &mut BitWriter<W>, table: &CodeTable, data: &[u8]) -> Result<()> {
    for &byte in data {
        bw.append_bitstring(table.code(byte)?)?;
    }
    Ok(())
}

fn write_name<W: Write>(bw: &mut BitWriter<W>, table: &CodeTable, name: &[u8]) -> Result<()> {
    bw.append_byte(name.len() as u8)?;
    write_coded(bw, table, name)
}

/// Serialize a counted entry, recursing into directories. Only file contents are read again.
fn write_entry<W: Write>(
    bw: &mut BitWriter<W>,
    node: &ScanNode,
    table: &CodeTable,
    progress: &ProgressTracker<'_>,
) -> Result<()> {
    match node {
        ScanNode::Directory { name, children } => {
            trace!("Directory {} at {}", String::from_utf8_lossy(name), bw.loc());
            bw.append_bit(false)?;
            write_name(bw, table, name)?;
            bw.append_le(children.len() as u64, 2)?;
            for child in children {
                write_entry(bw, child, table, progress)?;
            }
        }
        ScanNode::File { path, name, size } => {
            let content = fs::read(path)?;
            if content.len() as u64 != *size {
                return Err(ArchiveError::corrupt(
                    Section::Body,
                    format!("{} changed size while compressing", path.display()),
                ));
            }
            trace!("File {} at {}", path.display(), bw.loc());
            bw.append_bit(true)?;
            bw.append_le(*size, 8)?;
            write_name(bw, table, name)?;
            write_coded(bw, table, &content)?;
            progress.advance(*size);
        }
    }
    Ok(())
}

/// Encode one counted root input into `sink`, starting at bit 0 and ending on a byte boundary.
/// Returns the sink so a worker can hand its buffer back.
pub fn encode_root<W: Write>(
    sink: W,
    root: &ScanNode,
    table: &CodeTable,
    progress: &ProgressTracker<'_>,
) -> Result<W> {
    let mut bw = BitWriter::new(sink);
    write_entry(&mut bw, root, table, progress)?;
    debug!("Encoded root entry into {} bits", bw.bit_len());
    bw.close()
}

fn read_name<R: Read>(br: &mut BitReader<R>, book: &CodeBook) -> Result<Vec<u8>> {
    let len = br.read_byte()? as usize;
    (0..len).map(|_| book.decode(|| br.read_bit())).collect()
}

/// Decode one entry (and everything below it).
pub fn read_entry<R: Read>(br: &mut BitReader<R>, book: &CodeBook) -> Result<ArchiveEntry> {
    read_nested(br, book, 0)
}

fn read_nested<R: Read>(
    br: &mut BitReader<R>,
    book: &CodeBook,
    depth: usize,
) -> Result<ArchiveEntry> {
    if depth > MAX_DEPTH {
        return Err(ArchiveError::InvalidArchive(format!(
            "directories nested more than {} levels deep at {}",
            MAX_DEPTH,
            br.loc()
        )));
    }
    if br.read_bit()? {
        let size = br.read_le(8)?;
        let name = read_name(br, book)?;
        // Don't trust the size field for the allocation
        let mut content = Vec::with_capacity(size.min(1 << 20) as usize);
        for _ in 0..size {
            content.push(book.decode(|| br.read_bit())?);
        }
        Ok(ArchiveEntry::File { name, content })
    } else {
        let name = read_name(br, book)?;
        let count = br.read_le(2)?;
        let children = (0..count)
            .map(|_| read_nested(br, book, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(ArchiveEntry::Directory { name, children })
    }
}
