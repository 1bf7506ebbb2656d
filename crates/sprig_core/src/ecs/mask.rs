// mask.rs - Fixed-width component bitset
//
// One bit per registered component type. The width is fixed when the mask
// is created from the registry's type count.

use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// Bitset over component type ids.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Mask {
    words: Box<[u64]>,
    universe: usize,
}

impl Mask {
    /// Empty mask able to hold bits `0..universe`.
    pub fn new(universe: usize) -> Self {
        Self {
            words: vec![0; universe.div_ceil(WORD_BITS)].into_boxed_slice(),
            universe,
        }
    }

    /// Mask with the given bits set.
    pub fn from_bits(universe: usize, bits: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::new(universe);
        for bit in bits {
            mask.set(bit);
        }
        mask
    }

    #[inline]
    fn locate(&self, bit: usize) -> (usize, u64) {
        assert!(
            bit < self.universe,
            "component type {bit} is outside the mask universe of {}",
            self.universe
        );
        (bit / WORD_BITS, 1 << (bit % WORD_BITS))
    }

    /// Set `bit`. Panics if `bit` is outside the universe.
    #[inline]
    pub fn set(&mut self, bit: usize) -> &mut Self {
        let (word, flag) = self.locate(bit);
        self.words[word] |= flag;
        self
    }

    /// Clear `bit`. Panics if `bit` is outside the universe.
    #[inline]
    pub fn delete(&mut self, bit: usize) -> &mut Self {
        let (word, flag) = self.locate(bit);
        self.words[word] &= !flag;
        self
    }

    /// Bits outside the universe are never set.
    #[inline]
    pub fn has(&self, bit: usize) -> bool {
        bit < self.universe && self.words[bit / WORD_BITS] & (1 << (bit % WORD_BITS)) != 0
    }

    /// True if the two masks share at least one bit.
    #[inline]
    pub fn any(&self, other: &Mask) -> bool {
        debug_assert_eq!(self.universe, other.universe);
        self.words.iter().zip(other.words.iter()).any(|(a, b)| a & b != 0)
    }

    /// True if every bit of `other` is also set here.
    #[inline]
    pub fn include(&self, other: &Mask) -> bool {
        debug_assert_eq!(self.universe, other.universe);
        self.words.iter().zip(other.words.iter()).all(|(a, b)| a & b == *b)
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let offset = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(index * WORD_BITS + offset)
            })
        })
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
