//! Turns a code tree into the per-byte code strings used by the encoder, and the reverse
//! lookup used by the decoder.

use log::trace;
use rustc_hash::FxHashMap;

use super::huffman::{HuffmanNode, HuffmanTree};
use crate::error::{ArchiveError, Result, Section};

/// Code given to the only symbol of a one-letter alphabet.
pub const DEGENERATE_CODE: &str = "0";

/// Longest code the decoder accepts. Weights are u64, which keeps real trees far below this.
pub const MAX_CODE_LEN: usize = 128;

/// Code string for every byte that occurs in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: FxHashMap<u8, String>,
    /// Table section order, copied from the tree's leaf order.
    order: Vec<u8>,
}

impl CodeTable {
    /// Walk the tree from the root. Going left appends '1', going right appends '0'.
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut codes = FxHashMap::default();
        codes.reserve(tree.letter_count());
        match &tree.root {
            HuffmanNode::Leaf { byte, .. } => {
                codes.insert(*byte, DEGENERATE_CODE.to_string());
            }
            root => assign_codes(root, String::new(), &mut codes),
        }
        Self {
            codes,
            order: tree.leaf_order.clone(),
        }
    }

    /// Build a table straight from (byte, code) pairs, in table section order.
    pub fn from_entries(entries: Vec<(u8, String)>) -> Self {
        let order = entries.iter().map(|(b, _)| *b).collect();
        Self {
            codes: entries.into_iter().collect(),
            order,
        }
    }

    /// Code for `byte`. Bytes that never occurred have no code; asking for one is an error.
    pub fn code(&self, byte: u8) -> Result<&str> {
        self.codes.get(&byte).map(String::as_str).ok_or_else(|| {
            ArchiveError::corrupt(Section::Body, format!("no code for byte 0x{:02x}", byte))
        })
    }

    /// (byte, code) pairs in table section order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.order
            .iter()
            .filter_map(move |b| self.codes.get(b).map(|c| (*b, c.as_str())))
    }

    pub fn letter_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Code length in bits for `byte`, 0 when it has no code.
    pub fn code_len(&self, byte: u8) -> usize {
        self.codes.get(&byte).map_or(0, String::len)
    }
}

fn assign_codes(node: &HuffmanNode, prefix: String, codes: &mut FxHashMap<u8, String>) {
    match node {
        HuffmanNode::Leaf { byte, .. } => {
            trace!("0x{:02x} -> {}", byte, prefix);
            codes.insert(*byte, prefix);
        }
        HuffmanNode::Internal { left, right, .. } => {
            assign_codes(left, format!("{}1", prefix), codes);
            assign_codes(right, prefix + "0", codes);
        }
    }
}

/// Reverse lookup from (length, bits) to byte, built from the table section of an archive.
#[derive(Debug)]
pub struct CodeBook {
    symbols: FxHashMap<(usize, u128), u8>,
    max_len: usize,
}

impl CodeBook {
    /// Build the lookup, rejecting tables that cannot be decoded unambiguously.
    pub fn new(table: &CodeTable) -> Result<Self> {
        let mut symbols = FxHashMap::default();
        let mut max_len = 0;
        for (byte, code) in table.entries() {
            if code.is_empty() || code.len() > MAX_CODE_LEN {
                return Err(ArchiveError::InvalidArchive(format!(
                    "code length {} for byte 0x{:02x}",
                    code.len(),
                    byte
                )));
            }
            let mut bits = 0_u128;
            for c in code.chars() {
                bits = bits << 1 | (c == '1') as u128;
            }
            if symbols.insert((code.len(), bits), byte).is_some() {
                return Err(ArchiveError::InvalidArchive(format!(
                    "duplicate code {}",
                    code
                )));
            }
            max_len = max_len.max(code.len());
        }
        Ok(Self { symbols, max_len })
    }

    /// Pull bits from `next_bit` until they spell a code, and return its byte.
    pub fn decode<F>(&self, mut next_bit: F) -> Result<u8>
    where
        F: FnMut() -> Result<bool>,
    {
        let mut bits = 0_u128;
        for len in 1..=self.max_len {
            bits = bits << 1 | next_bit()? as u128;
            if let Some(&byte) = self.symbols.get(&(len, bits)) {
                return Ok(byte);
            }
        }
        Err(ArchiveError::InvalidArchive(
            "bit sequence matches no code".to_string(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::huffman_coding::huffman::build_tree;
    use crate::tools::freq_count::freqs;

    fn table_for(data: &[u8]) -> CodeTable {
        CodeTable::from_tree(&build_tree(&freqs(data, false)).unwrap())
    }

    #[test]
    fn two_symbol_codes() {
        let table = table_for(b"aaab");
        assert_eq!(table.code(b'b').unwrap(), "1");
        assert_eq!(table.code(b'a').unwrap(), "0");
        assert_eq!(table.entries().collect::<Vec<_>>(), vec![(b'b', "1"), (b'a', "0")]);
    }

    #[test]
    fn tie_break_codes() {
        let table = table_for(b"xyzz");
        assert_eq!(table.code(b'x').unwrap(), "11");
        assert_eq!(table.code(b'y').unwrap(), "10");
        assert_eq!(table.code(b'z').unwrap(), "0");
    }

    #[test]
    fn degenerate_alphabet_gets_one_bit() {
        let table = table_for(b"qqqqqq");
        assert_eq!(table.code(b'q').unwrap(), DEGENERATE_CODE);
        assert_eq!(table.letter_count(), 1);
    }

    #[test]
    fn unobserved_byte_has_no_code() {
        let table = table_for(b"abc");
        assert!(matches!(
            table.code(b'z'),
            Err(ArchiveError::StreamCorruption { .. })
        ));
        assert_eq!(table.code_len(b'z'), 0);
    }

    #[test]
    fn codes_are_prefix_free() {
        let data: Vec<u8> = (0..5000_u32).map(|i| ((i * i) % 97) as u8).collect();
        let table = table_for(&data);
        let codes: Vec<&str> = table.entries().map(|(_, c)| c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "{} is a prefix of {}", a, b);
                }
            }
        }
    }

    #[test]
    fn codebook_decodes_what_the_table_encodes() {
        let table = table_for(b"abracadabra");
        let book = CodeBook::new(&table).unwrap();
        let bits: Vec<bool> = b"cab"
            .iter()
            .flat_map(|&b| table.code(b).unwrap().chars().map(|c| c == '1').collect::<Vec<_>>())
            .collect();
        let mut iter = bits.into_iter();
        let mut next = || iter.next().ok_or(ArchiveError::UnexpectedEof);
        assert_eq!(book.decode(&mut next).unwrap(), b'c');
        assert_eq!(book.decode(&mut next).unwrap(), b'a');
        assert_eq!(book.decode(&mut next).unwrap(), b'b');
    }

    #[test]
    fn codebook_rejects_duplicates() {
        let table = CodeTable::from_entries(vec![(1, "01".into()), (2, "01".into())]);
        assert!(CodeBook::new(&table).is_err());
    }
}
