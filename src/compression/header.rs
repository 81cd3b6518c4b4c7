//! Fixed header and code table section.
//!
//! ```text
//! 8 bytes   plaintext size, least significant byte first
//! 1 byte    letter count (mod 256, so a full alphabet reads back as 0)
//! 1 byte    password flag, 0 = none
//! 1 byte    password length        (only when the flag is set)
//! n bytes   password               (only when the flag is set)
//! bits      code table: per symbol 8 bit byte value, 8 bit code length, code bits
//! ```
//!
//! The header is byte aligned. The code table starts the bit-packed part of the stream.

use std::io::{Read, Write};

use log::{debug, trace};

use super::Layout;
use crate::bitstream::{bitreader::BitReader, bitwriter::BitWriter};
use crate::error::{ArchiveError, Result, Section};
use crate::huffman_coding::code_table::{CodeTable, MAX_CODE_LEN};

/// Longest password the header can carry.
pub const MAX_PASSWORD_LEN: usize = 100;

/// Bits taken by each table entry before its code: byte value plus code length.
const TABLE_ENTRY_BITS: u64 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Sum of all file content sizes.
    pub total_size: u64,
    /// Letter count byte as stored (truncated mod 256).
    pub stored_letters: u8,
    /// Stored verbatim; never used to transform data.
    pub password: Option<Vec<u8>>,
}

impl Header {
    /// Build a header, checking the password length.
    pub fn new(total_size: u64, letter_count: usize, password: Option<Vec<u8>>) -> Result<Self> {
        if let Some(pw) = &password {
            if pw.is_empty() || pw.len() > MAX_PASSWORD_LEN {
                return Err(ArchiveError::PasswordInvalid(pw.len()));
            }
        }
        Ok(Self {
            total_size,
            // Deliberately truncated: 256 symbols are written as 0
            stored_letters: letter_count as u8,
            password,
        })
    }

    /// Size of the header in bytes.
    pub fn byte_len(&self) -> u64 {
        10 + self.password.as_ref().map_or(0, |pw| 1 + pw.len() as u64)
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.total_size.to_le_bytes())?;
        out.write_all(&[self.stored_letters])?;
        match &self.password {
            Some(pw) => {
                out.write_all(&[1, pw.len() as u8])?;
                out.write_all(pw)?;
            }
            None => out.write_all(&[0])?,
        }
        Ok(())
    }

    pub fn read<R: Read>(br: &mut BitReader<R>) -> Result<Self> {
        let total_size = br.read_le(8)?;
        let stored_letters = br.read_byte()?;
        let password = match br.read_byte()? {
            0 => None,
            _ => {
                let len = br.read_byte()? as usize;
                if len == 0 || len > MAX_PASSWORD_LEN {
                    return Err(ArchiveError::InvalidArchive(format!(
                        "password length {}",
                        len
                    )));
                }
                Some(br.read_bytes(len)?)
            }
        };
        debug!(
            "Header: {} bytes of plaintext, letter byte {}, password {}",
            total_size,
            stored_letters,
            if password.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            total_size,
            stored_letters,
            password,
        })
    }

    /// Number of table entries that follow. A stored 0 is a full 256 symbol alphabet, except
    /// for an empty stream which has no table at all.
    pub fn letter_count(&self, layout: Layout) -> usize {
        match (self.stored_letters, layout) {
            (0, Layout::Stream) if self.total_size == 0 => 0,
            (0, _) => 256,
            (n, _) => n as usize,
        }
    }
}

/// Write the code table section in leaf order.
pub fn write_code_table<W: Write>(bw: &mut BitWriter<W>, table: &CodeTable) -> Result<()> {
    trace!("Code table starts at {}", bw.loc());
    for (byte, code) in table.entries() {
        if code.len() > MAX_CODE_LEN {
            return Err(ArchiveError::corrupt(
                Section::CodeTable,
                format!("code for 0x{:02x} is {} bits", byte, code.len()),
            ));
        }
        bw.append_byte(byte)?;
        bw.append_byte(code.len() as u8)?;
        bw.append_bitstring(code).map_err(|e| match e {
            ArchiveError::StreamCorruption { detail, .. } => {
                ArchiveError::corrupt(Section::CodeTable, detail)
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Read `count` table entries.
pub fn read_code_table<R: Read>(br: &mut BitReader<R>, count: usize) -> Result<CodeTable> {
    let mut seen = [false; 256];
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let byte = br.read_byte()?;
        let len = br.read_byte()? as usize;
        if seen[byte as usize] {
            return Err(ArchiveError::InvalidArchive(format!(
                "byte 0x{:02x} listed twice in the code table",
                byte
            )));
        }
        seen[byte as usize] = true;
        let code = (0..len)
            .map(|_| br.read_bit().map(|bit| if bit { '1' } else { '0' }))
            .collect::<Result<String>>()?;
        entries.push((byte, code));
    }
    Ok(CodeTable::from_entries(entries))
}

/// Bits the table section occupies.
pub fn table_bits(table: &CodeTable) -> u64 {
    table
        .entries()
        .map(|(_, code)| TABLE_ENTRY_BITS + code.len() as u64)
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::huffman_coding::huffman::build_tree;
    use crate::tools::freq_count::freqs;

    #[test]
    fn header_without_password() {
        let header = Header::new(4, 2, None).unwrap();
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out, vec![4, 0, 0, 0, 0, 0, 0, 0, 2, 0]);
        assert_eq!(header.byte_len(), out.len() as u64);
    }

    #[test]
    fn header_with_password() {
        let header = Header::new(0x0102, 3, Some(b"hunter2".to_vec())).unwrap();
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(&out[..12], &[2, 1, 0, 0, 0, 0, 0, 0, 3, 1, 7, b'h']);
        assert_eq!(header.byte_len(), out.len() as u64);

        let mut br = BitReader::new(out.as_slice());
        assert_eq!(Header::read(&mut br).unwrap(), header);
    }

    #[test]
    fn password_limits() {
        assert!(matches!(
            Header::new(0, 0, Some(vec![])),
            Err(ArchiveError::PasswordInvalid(0))
        ));
        assert!(matches!(
            Header::new(0, 0, Some(vec![b'x'; 101])),
            Err(ArchiveError::PasswordInvalid(101))
        ));
        assert!(Header::new(0, 0, Some(vec![b'x'; 100])).is_ok());
    }

    #[test]
    fn full_alphabet_stores_zero() {
        let header = Header::new(256, 256, None).unwrap();
        assert_eq!(header.stored_letters, 0);
        assert_eq!(header.letter_count(Layout::Stream), 256);
        assert_eq!(header.letter_count(Layout::Archive), 256);
        let empty = Header::new(0, 0, None).unwrap();
        assert_eq!(empty.letter_count(Layout::Stream), 0);
    }

    #[test]
    fn code_table_layout() {
        let table = CodeTable::from_tree(&build_tree(&freqs(b"aaab", false)).unwrap());
        let mut bw = BitWriter::new(Vec::new());
        write_code_table(&mut bw, &table).unwrap();
        assert_eq!(table_bits(&table), 34);
        assert_eq!(bw.bit_len(), 34);
        let out = bw.close().unwrap();
        // 'b' len 1 code 1, 'a' len 1 code 0
        assert_eq!(out, vec![0x62, 0x01, 0xb0, 0x80, 0x80]);

        let mut br = BitReader::new(out.as_slice());
        assert_eq!(read_code_table(&mut br, 2).unwrap(), table);
    }

    #[test]
    fn corrupt_code_reports_table_section() {
        let table = CodeTable::from_entries(vec![(b'a', "0".into()), (b'b', "12".into())]);
        let mut bw = BitWriter::new(Vec::new());
        let err = write_code_table(&mut bw, &table).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
