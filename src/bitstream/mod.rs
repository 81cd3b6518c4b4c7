//! The bitstream module forms the I/O subsystem of the archiver.
//!
//! Everything after the fixed header is bit-packed, most significant bit first. The writer is
//! generic over its byte sink so the same code can write straight to the output file or into a
//! worker's private buffer. Each root level input of an archive is written by its own writer
//! starting at bit 0, so every unit ends with 0-7 bits of zero padding.
//!
//! The reader mirrors the writer and adds align(), which the decoder uses to step over that
//! padding at unit boundaries.
//!
pub mod bitreader;
pub mod bitwriter;
