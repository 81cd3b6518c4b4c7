//! The huffman module turns the shared byte frequency table into codes.
//!
//! One order-0 model covers every file and every name in the archive, so there is exactly one
//! tree and one code table per archive. Building them is the sequential midpoint between the
//! two parallel phases: it needs the complete frequency table and cannot start any earlier.
//!
//! The tree is built with the two-queue merge (sort the leaves once, then merge the fronts of
//! the leaf queue and the internal queue). Codes are assigned root to leaf, '1' for the left
//! branch and '0' for the right. A one-symbol alphabet gets the single code "0".
//!

pub mod code_table;
pub mod huffman;
