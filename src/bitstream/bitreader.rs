//! BitReader: reads back the packed bitstream written by BitWriter.
//!
//! NOTE: This module can read from any I/O source that supports the read() call.
//!

use std::io::{self, Read};

use crate::error::{ArchiveError, Result};

const BUFFER_SIZE: usize = 64 * 1024;
const BIT_MASK: u8 = 0x80;

/// Reads bits MSB-first from a buffered source.
#[derive(Debug)]
pub struct BitReader<R> {
    buffer: Vec<u8>,
    cursor: usize,
    bit_index: usize,
    source: R,
}

impl<R: Read> BitReader<R> {
    /// Creates a new BitReader (with a 64k buffer).
    pub fn new(source: R) -> Self {
        Self {
            buffer: Vec::with_capacity(BUFFER_SIZE),
            cursor: 0,
            bit_index: 0,
            source,
        }
    }

    /// Check (and refill) buffer. Returns false if there is no more data.
    fn have_data(&mut self) -> io::Result<bool> {
        // Only try to read more data when the cursor has walked off the end of the buffer
        if self.cursor == self.buffer.len() {
            self.buffer.resize(BUFFER_SIZE, 0);
            let size = loop {
                match self.source.read(&mut self.buffer) {
                    Ok(size) => break size,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            self.buffer.truncate(size);
            self.cursor = 0;
            self.bit_index = 0;
            if size == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Return the next bit, or UnexpectedEof when the source is exhausted.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bit_index == 0 && !self.have_data()? {
            return Err(ArchiveError::UnexpectedEof);
        }
        let bit = self.buffer[self.cursor] & (BIT_MASK >> self.bit_index) != 0;
        self.bit_index += 1;
        if self.bit_index == 8 {
            self.bit_index = 0;
            self.cursor += 1;
        }
        Ok(bit)
    }

    /// Return the next 8 bits as a byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.bit_index == 0 {
            // Byte aligned, take it straight from the buffer
            if !self.have_data()? {
                return Err(ArchiveError::UnexpectedEof);
            }
            let byte = self.buffer[self.cursor];
            self.cursor += 1;
            return Ok(byte);
        }
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte = byte << 1 | self.read_bit()? as u8;
        }
        Ok(byte)
    }

    /// Read `count` bytes as a little endian unsigned integer.
    pub fn read_le(&mut self, count: usize) -> Result<u64> {
        let mut value = 0_u64;
        for i in 0..count {
            value |= (self.read_byte()? as u64) << (8 * i);
        }
        Ok(value)
    }

    /// Returns n bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        (0..n).map(|_| self.read_byte()).collect()
    }

    /// Drop whatever is left of a partially read byte so the next read starts on a byte boundary.
    pub fn align(&mut self) {
        if self.bit_index != 0 {
            self.bit_index = 0;
            self.cursor += 1;
        }
    }

    /// True when every byte of the source has been consumed.
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.bit_index == 0 && !self.have_data()?)
    }

    /// Debugging function. Report current position in the buffer.
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.cursor, self.bit_index)
    }
}
