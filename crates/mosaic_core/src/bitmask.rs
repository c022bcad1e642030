//! Growable bit-vector used for component identifiers and composition masks.
//!
//! A `Bitmask` behaves like an arbitrary-precision unsigned integer: it never
//! truncates, no matter how many component types get registered. Words are
//! stored little-endian and trailing zero words are always trimmed, so two
//! masks with the same bits set compare and hash equal.

use smallvec::SmallVec;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

const WORD_BITS: u32 = u64::BITS;

/// Arbitrary-width unsigned bit-vector.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitmask {
    words: SmallVec<[u64; 2]>,
}

impl Bitmask {
    /// The empty mask (numeric value 0).
    pub fn new() -> Self {
        Self {
            words: SmallVec::new(),
        }
    }

    /// Mask with exactly one bit set at `index` (value `1 << index`).
    pub fn from_bit(index: u32) -> Self {
        let mut mask = Self::new();
        mask.set(index);
        mask
    }

    /// Mask with every listed bit set.
    pub fn from_bits<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut mask = Self::new();
        for index in indices {
            mask.set(index);
        }
        mask
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.words.is_empty()
    }

    /// Set a single bit by position.
    pub fn set(&mut self, index: u32) {
        let word = (index / WORD_BITS) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % WORD_BITS);
    }

    /// Clear a single bit by position. Clearing an absent bit is a no-op.
    pub fn clear(&mut self, index: u32) {
        let word = (index / WORD_BITS) as usize;
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1u64 << (index % WORD_BITS));
            self.normalize();
        }
    }

    /// Test a single bit by position.
    pub fn test(&self, index: u32) -> bool {
        let word = (index / WORD_BITS) as usize;
        self.words
            .get(word)
            .map_or(false, |&w| w & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Position of the highest set bit, `None` for the empty mask.
    pub fn highest_bit(&self) -> Option<u32> {
        let last = self.words.last()?;
        let top = WORD_BITS - 1 - last.leading_zeros();
        Some((self.words.len() as u32 - 1) * WORD_BITS + top)
    }

    /// Position of the only set bit, or `None` when zero or several bits are set.
    pub fn single_bit_index(&self) -> Option<u32> {
        if self.count_ones() == 1 {
            self.highest_bit()
        } else {
            None
        }
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Iterate the positions of every set bit, lowest first.
    pub fn iter_ones(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = i as u32 * WORD_BITS;
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| base + bit)
        })
    }

    /// `true` when every bit of `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Bitmask) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, &w)| w & other.word(i) == w)
    }

    /// `true` when the two masks share at least one set bit.
    pub fn intersects(&self, other: &Bitmask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Numeric value if it fits into 128 bits.
    pub fn to_u128(&self) -> Option<u128> {
        match self.words.as_slice() {
            [] => Some(0),
            [lo] => Some(*lo as u128),
            [lo, hi] => Some(((*hi as u128) << 64) | *lo as u128),
            _ => None,
        }
    }

    #[inline]
    fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }

    fn normalize(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    fn zip_with(&self, other: &Bitmask, f: impl Fn(u64, u64) -> u64) -> Bitmask {
        let len = self.words.len().max(other.words.len());
        let mut words = SmallVec::with_capacity(len);
        for i in 0..len {
            words.push(f(self.word(i), other.word(i)));
        }
        let mut mask = Bitmask { words };
        mask.normalize();
        mask
    }
}

impl From<u64> for Bitmask {
    fn from(value: u64) -> Self {
        let mut mask = Bitmask::new();
        mask.words.push(value);
        mask.normalize();
        mask
    }
}

impl From<u128> for Bitmask {
    fn from(value: u128) -> Self {
        let mut mask = Bitmask::new();
        mask.words.push(value as u64);
        mask.words.push((value >> 64) as u64);
        mask.normalize();
        mask
    }
}

impl BitOr for &Bitmask {
    type Output = Bitmask;

    fn bitor(self, rhs: &Bitmask) -> Bitmask {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl BitAnd for &Bitmask {
    type Output = Bitmask;

    fn bitand(self, rhs: &Bitmask) -> Bitmask {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl BitXor for &Bitmask {
    type Output = Bitmask;

    fn bitxor(self, rhs: &Bitmask) -> Bitmask {
        self.zip_with(rhs, |a, b| a ^ b)
    }
}

impl fmt::Binary for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(top) = self.highest_bit() else {
            return f.pad_integral(true, "0b", "0");
        };
        let digits: String = (0..=top)
            .rev()
            .map(|bit| if self.test(bit) { '1' } else { '0' })
            .collect();
        f.pad_integral(true, "0b", &digits)
    }
}

impl fmt::Display for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self)
    }
}

impl fmt::Debug for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmask({:#b})", self)
    }
}

/// `mask | bits`
pub fn add_bit(mask: &Bitmask, bits: &Bitmask) -> Bitmask {
    mask | bits
}

/// `mask & !bits`. Removing absent bits leaves the mask unchanged.
pub fn remove_bit(mask: &Bitmask, bits: &Bitmask) -> Bitmask {
    mask.zip_with(bits, |a, b| a & !b)
}

/// `mask ^ bits`. Applying it twice restores the original mask.
pub fn toggle_bit(mask: &Bitmask, bits: &Bitmask) -> Bitmask {
    mask ^ bits
}

/// `true` iff every bit of `bits` is set in `mask`. Vacuously true for an empty `bits`.
pub fn has_bit(mask: &Bitmask, bits: &Bitmask) -> bool {
    bits.is_subset_of(mask)
}

/// `true` iff `mask & bits != 0`.
pub fn has_any_of_bits(mask: &Bitmask, bits: &Bitmask) -> bool {
    mask.intersects(bits)
}

/// Flip every bit from bit 0 up to the highest set bit of `mask`.
///
/// This is not a fixed-width complement: `0b1010` becomes `0b0101`, and the
/// result is trimmed like any other mask. Diagnostic only.
pub fn toggle_all_bits(mask: &Bitmask) -> Bitmask {
    let Some(top) = mask.highest_bit() else {
        return Bitmask::new();
    };
    let mut flipped = Bitmask::new();
    for bit in 0..=top {
        if !mask.test(bit) {
            flipped.set(bit);
        }
    }
    flipped
}
