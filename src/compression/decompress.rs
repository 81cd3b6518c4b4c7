//! Decoding of both layouts, and writing a decoded archive back to disk.

use std::{
    ffi::OsStr,
    fs::{self, File},
    io::Read,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use super::archive::read_entry;
use super::entry::ArchiveEntry;
use super::header::{read_code_table, Header};
use super::Layout;
use crate::bitstream::bitreader::BitReader;
use crate::error::{ArchiveError, Result};
use crate::huffman_coding::code_table::CodeBook;

/// Extension added by the compressor and removed again for raw streams.
pub const EXTENSION: &str = "compressed";

/// A fully decoded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArchive {
    pub header: Header,
    pub entries: Vec<ArchiveEntry>,
}

/// Warn about bytes after the last padded unit.
fn check_trailing<R: Read>(br: &mut BitReader<R>) -> Result<()> {
    br.align();
    if !br.at_end()? {
        warn!("Ignoring trailing data at {}", br.loc());
    }
    Ok(())
}

/// Decode a stream layout source into its header and plaintext.
pub fn read_stream<R: Read>(source: R) -> Result<(Header, Vec<u8>)> {
    let mut br = BitReader::new(source);
    let header = Header::read(&mut br)?;
    let table = read_code_table(&mut br, header.letter_count(Layout::Stream))?;
    if header.total_size == 0 {
        check_trailing(&mut br)?;
        return Ok((header, Vec::new()));
    }
    let book = CodeBook::new(&table)?;
    let mut data = Vec::with_capacity(header.total_size.min(1 << 20) as usize);
    for _ in 0..header.total_size {
        data.push(book.decode(|| br.read_bit())?);
    }
    check_trailing(&mut br)?;
    Ok((header, data))
}

/// In-memory counterpart of `compress::encode_bytes`.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    read_stream(bytes).map(|(_, data)| data)
}

/// Decode an archive layout source into its entry trees, in root order.
pub fn read_archive<R: Read>(source: R) -> Result<DecodedArchive> {
    let mut br = BitReader::new(source);
    let header = Header::read(&mut br)?;
    let table = read_code_table(&mut br, header.letter_count(Layout::Archive))?;
    let roots = br.read_le(2)?;
    br.align();
    debug!("{} root entries start at {}", roots, br.loc());

    let mut entries = Vec::with_capacity(roots as usize);
    if roots > 0 {
        let book = CodeBook::new(&table)?;
        for _ in 0..roots {
            entries.push(read_entry(&mut br, &book)?);
            br.align();
        }
    }
    check_trailing(&mut br)?;

    let content: u64 = entries.iter().map(ArchiveEntry::content_size).sum();
    if content != header.total_size {
        warn!(
            "Header declares {} bytes of content, entries hold {}",
            header.total_size, content
        );
    }
    Ok(DecodedArchive { header, entries })
}

/// A name that may be created inside a directory: one non-empty path component.
fn child_name(name: &[u8]) -> Result<&OsStr> {
    if name.is_empty() || name == b"." || name == b".." || name.contains(&b'/') || name.contains(&0)
    {
        return Err(ArchiveError::InvalidArchive(format!(
            "refusing to create {:?}",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(OsStr::from_bytes(name))
}

/// Root entries carry the argument text they were compressed from. Only its last component
/// is used, so nothing lands outside the destination.
fn root_target(name: &[u8]) -> Option<&OsStr> {
    Path::new(OsStr::from_bytes(name)).file_name()
}

fn write_tree(entry: &ArchiveEntry, target: &Path, force: bool) -> Result<u64> {
    match entry {
        ArchiveEntry::File { content, .. } => {
            if !force && target.exists() {
                return Err(ArchiveError::OutputExists(target.to_path_buf()));
            }
            fs::write(target, content)?;
            debug!("Wrote {} ({} bytes)", target.display(), content.len());
            Ok(1)
        }
        ArchiveEntry::Directory { children, .. } => {
            if target.exists() && !(force && target.is_dir()) {
                return Err(ArchiveError::OutputExists(target.to_path_buf()));
            }
            fs::create_dir_all(target)?;
            let mut files = 0;
            for child in children {
                files += write_tree(child, &target.join(child_name(child.name())?), force)?;
            }
            Ok(files)
        }
    }
}

/// Materialize decoded roots below `out_dir`. Returns the number of files written.
///
/// A directory root whose name has no final component (written by other tools for an
/// argument like ".") has its children unpacked straight into `out_dir`.
pub fn unpack(entries: &[ArchiveEntry], out_dir: &Path, force: bool) -> Result<u64> {
    fs::create_dir_all(out_dir)?;
    let mut files = 0;
    for entry in entries {
        files += match (root_target(entry.name()), entry) {
            (Some(target), _) => write_tree(entry, &out_dir.join(target), force)?,
            (None, ArchiveEntry::Directory { children, .. }) => {
                debug!(
                    "Root {:?} goes straight into {}",
                    String::from_utf8_lossy(entry.name()),
                    out_dir.display()
                );
                let mut written = 0;
                for child in children {
                    written += write_tree(child, &out_dir.join(child_name(child.name())?), force)?;
                }
                written
            }
            (None, ArchiveEntry::File { .. }) => {
                return Err(ArchiveError::InvalidArchive(format!(
                    "root file name {:?} has no final component",
                    String::from_utf8_lossy(entry.name())
                )))
            }
        };
    }
    Ok(files)
}

/// Default destination of a raw stream: the input without its extension.
pub fn stream_output(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == EXTENSION => input.with_extension(""),
        _ => input.with_extension("out"),
    }
}

/// Decompress `input`. Raw streams go to a file (default: the input minus its extension),
/// archives are unpacked into a directory (default: the current one).
pub fn decompress(
    input: &Path,
    output: Option<&Path>,
    layout: Layout,
    force: bool,
) -> Result<PathBuf> {
    let file = File::open(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArchiveError::InputNotFound(input.to_path_buf()),
        _ => e.into(),
    })?;
    match layout {
        Layout::Stream => {
            let target = output.map_or_else(|| stream_output(input), Path::to_path_buf);
            if !force && target.exists() {
                return Err(ArchiveError::OutputExists(target));
            }
            let (_, data) = read_stream(file)?;
            fs::write(&target, &data)?;
            info!("Restored {} bytes into {}", data.len(), target.display());
            Ok(target)
        }
        Layout::Archive => {
            let target = output.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            let archive = read_archive(file)?;
            let files = unpack(&archive.entries, &target, force)?;
            info!(
                "Restored {} files ({} bytes) into {}",
                files,
                archive.header.total_size,
                target.display()
            );
            Ok(target)
        }
    }
}
