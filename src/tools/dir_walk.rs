use std::{
    ffi::OsString,
    fs,
    io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::error::{ArchiveError, Result};

/// One child of a directory being archived.
#[derive(Debug, Clone)]
pub struct DirChild {
    /// Raw name bytes, as stored in the archive.
    pub name: Vec<u8>,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A file that must never show up in a listing, normally the archive being written.
/// Held as canonical parent directory plus file name, so it also works before the file exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excluded {
    dir: PathBuf,
    name: OsString,
}

impl Excluded {
    /// None when the parent directory cannot be resolved; nothing inside it can be listed then.
    pub fn new(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_os_string();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir = fs::canonicalize(parent).ok()?;
        debug!("Excluding {} from listings", dir.join(&name).display());
        Some(Self { dir, name })
    }
}

/// List the children of `dir`, sorted by name bytes so every scan of the same tree yields the
/// same order. "." and ".." are never part of the listing, and neither is `exclude`.
pub fn list_dir(dir: &Path, exclude: Option<&Excluded>) -> io::Result<Vec<DirChild>> {
    let skip = match exclude {
        Some(ex) if fs::canonicalize(dir)? == ex.dir => Some(ex.name.as_os_str()),
        _ => None,
    };
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if skip == Some(name.as_os_str()) {
            trace!("Skipping {}", entry.path().display());
            continue;
        }
        let name = name.as_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        let path = entry.path();
        // Follow symlinks the way opening the path would
        let is_dir = fs::metadata(&path)?.is_dir();
        children.push(DirChild {
            name: name.to_vec(),
            path,
            is_dir,
        });
    }
    children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    trace!("{} holds {} entries", dir.display(), children.len());
    Ok(children)
}

/// Name bytes recorded for a root input: the argument as given, unless it has no final
/// component ("." or "a/.."). Those are named after the directory they resolve to.
pub fn root_name(path: &Path) -> Result<Vec<u8>> {
    if path.file_name().is_some() {
        return Ok(path.as_os_str().as_bytes().to_vec());
    }
    fs::canonicalize(path)?
        .file_name()
        .map(|name| name.as_bytes().to_vec())
        .ok_or_else(|| ArchiveError::Layout(format!("{} has no name to archive", path.display())))
}
