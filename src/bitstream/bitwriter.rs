use std::io::Write;

use log::trace;

use crate::error::{ArchiveError, Result, Section};

/// Partial byte state shared by the writer: an accumulator and how many of its low bits are valid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitCursor {
    /// Bits waiting to become a byte, right aligned.
    pub byte: u8,
    /// Count of valid bits in `byte` (0-7 between calls).
    pub bits: u8,
}

impl BitCursor {
    /// Push one bit. Returns the completed byte when the eighth bit arrives.
    #[inline(always)]
    fn push(&mut self, bit: bool) -> Option<u8> {
        self.byte = self.byte << 1 | bit as u8;
        self.bits += 1;
        if self.bits == 8 {
            let full = self.byte;
            self.byte = 0;
            self.bits = 0;
            return Some(full);
        }
        None
    }

    /// The pending bits left aligned and zero padded, or None when the cursor is empty.
    fn padded(&self) -> Option<u8> {
        if self.bits == 0 {
            None
        } else {
            Some(self.byte << (8 - self.bits))
        }
    }
}

/// Packs individual bits MSB-first onto a byte sink. The sink is anything that implements
/// Write: a file handle when writing directly, or a Vec<u8> when a worker writes into a
/// private buffer that is concatenated later.
pub struct BitWriter<W: Write> {
    sink: W,
    cursor: BitCursor,
    /// Complete bytes handed to the sink so far.
    bytes_out: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new BitWriter positioned at bit offset 0 of the sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            cursor: BitCursor::default(),
            bytes_out: 0,
        }
    }

    /// Continue a stream on a new sink, starting with the partial byte left by into_parts().
    pub fn with_cursor(sink: W, cursor: BitCursor) -> Self {
        Self {
            sink,
            cursor,
            bytes_out: 0,
        }
    }

    /// Hand back the sink and the pending partial byte, without padding it.
    pub fn into_parts(self) -> (W, BitCursor) {
        (self.sink, self.cursor)
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        self.sink.write_all(&[byte])?;
        self.bytes_out += 1;
        Ok(())
    }

    /// Put a single bit on the stream.
    pub fn append_bit(&mut self, bit: bool) -> Result<()> {
        if let Some(byte) = self.cursor.push(bit) {
            self.emit(byte)?;
        }
        Ok(())
    }

    /// Put a byte on the stream, most significant bit first.
    pub fn append_byte(&mut self, data: u8) -> Result<()> {
        if self.cursor.bits == 0 {
            // Already aligned, skip the bit loop
            return self.emit(data);
        }
        for shift in (0..8).rev() {
            self.append_bit(data >> shift & 1 == 1)?;
        }
        Ok(())
    }

    /// Put `count` bytes of `value` on the stream, least significant byte first.
    pub fn append_le(&mut self, mut value: u64, count: usize) -> Result<()> {
        for _ in 0..count {
            self.append_byte((value & 0xff) as u8)?;
            value >>= 8;
        }
        Ok(())
    }

    /// Put a code string of '1' and '0' characters on the stream. Any other character means
    /// the code table has been damaged.
    pub fn append_bitstring(&mut self, code: &str) -> Result<()> {
        for c in code.chars() {
            match c {
                '1' => self.append_bit(true)?,
                '0' => self.append_bit(false)?,
                other => {
                    return Err(ArchiveError::corrupt(
                        Section::Body,
                        format!("code {:?} contains {:?}", code, other),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Flushes the remaining bits (1-7), padding with 0s in the least significant bits, and
    /// hands back the sink. Must be called or the last partial byte is lost.
    pub fn close(mut self) -> Result<W> {
        if let Some(last) = self.cursor.padded() {
            trace!("Padding final byte with {} zero bits", 8 - self.cursor.bits);
            self.emit(last)?;
            self.cursor = BitCursor::default();
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Total bits put on the stream so far, including the pending partial byte.
    pub fn bit_len(&self) -> u64 {
        self.bytes_out * 8 + self.cursor.bits as u64
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.bytes_out, self.cursor.bits)
    }
}
