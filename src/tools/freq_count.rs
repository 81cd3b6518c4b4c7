use std::ops::{Add, AddAssign};

use rayon::prelude::*;

/// Occurrence count of every byte value. Contents and names share one table.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ByteFrequencyTable {
    counts: [u64; 256],
}

impl ByteFrequencyTable {
    pub fn new() -> Self {
        Self { counts: [0; 256] }
    }

    /// Count every byte of `data`.
    pub fn add_bytes(&mut self, data: &[u8]) {
        data.iter().for_each(|&el| self.counts[el as usize] += 1);
    }

    /// Count of one byte value.
    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Sum of all counts, i.e. the number of bytes scanned.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of byte values seen at least once.
    pub fn letter_count(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// (byte, weight) for every byte value seen, in ascending byte order.
    pub fn present(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(b, &c)| (b as u8, c))
    }
}

impl Default for ByteFrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AddAssign<&ByteFrequencyTable> for ByteFrequencyTable {
    fn add_assign(&mut self, other: &ByteFrequencyTable) {
        self.counts
            .iter_mut()
            .zip(other.counts.iter())
            .for_each(|(a, b)| *a += b);
    }
}

impl Add for ByteFrequencyTable {
    type Output = ByteFrequencyTable;
    fn add(mut self, other: ByteFrequencyTable) -> ByteFrequencyTable {
        self += &other;
        self
    }
}

/// Returns a frequency count of the input data. Uses parallelism when allowed and the data set is over 64k.
pub fn freqs(data: &[u8], parallel: bool) -> ByteFrequencyTable {
    if parallel && data.len() > 64_000 {
        // 16k is pretty much the sweet spot for chunk size.
        data.par_chunks(16_000)
            .fold(ByteFrequencyTable::new, |mut freqs, chunk| {
                freqs.add_bytes(chunk);
                freqs
            })
            .reduce(ByteFrequencyTable::new, |s, f| s + f)
    } else {
        let mut freqs = ByteFrequencyTable::new();
        freqs.add_bytes(data);
        freqs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_count() {
        let f = freqs(b"aaab", true);
        assert_eq!(f.get(b'a'), 3);
        assert_eq!(f.get(b'b'), 1);
        assert_eq!(f.letter_count(), 2);
        assert_eq!(f.total(), 4);
        assert_eq!(f.present().collect::<Vec<_>>(), vec![(b'a', 3), (b'b', 1)]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let data: Vec<u8> = (0..200_000_u32).map(|i| (i * 7 % 251) as u8).collect();
        assert_eq!(freqs(&data, true), freqs(&data, false));
        assert_eq!(freqs(&data, true).total(), 200_000);
    }

    #[test]
    fn combine_is_order_independent() {
        let a = freqs(b"hello", false);
        let b = freqs(b"world", false);
        assert_eq!(a.clone() + b.clone(), b + a);
    }
}
