//! Per-row presence masks.

/// One bit per column of a [`ColumnLayout`](crate::ColumnLayout), in column
/// order. A set bit means the column holds a real value of the stored
/// container; a clear bit means the column holds fill and must be ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceMask {
    len: usize,
    words: Vec<u64>,
}

impl PresenceMask {
    /// A mask of `len` clear bits.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(64)],
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut mask = Self::new(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            mask.set(i, bit);
        }
        mask
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    ///
    /// If `i` is not below [`len`](Self::len).
    pub fn set(&mut self, i: usize, present: bool) {
        assert!(i < self.len, "mask bit {i} out of range for {} bits", self.len);
        let bit = 1u64 << (i % 64);
        if present {
            self.words[i / 64] |= bit;
        } else {
            self.words[i / 64] &= !bit;
        }
    }

    /// Whether bit `i` is set; bits past the end read as clear.
    pub fn get(&self, i: usize) -> bool {
        i < self.len && self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    pub fn count_present(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Positions of the set bits, ascending.
    pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}
