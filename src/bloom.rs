use ahash::AHasher;
use core::hash::{Hash, Hasher as _};

const WORDS: usize = 4;
const BITS: u64 = (WORDS * 64) as u64;

/// Fixed-size bloom filter over the tokens bound by one injector.
///
/// `might_contain` never returns `false` for an added value, so a negative
/// answer lets the injector go straight to its parent.
#[derive(Debug, Clone, Default)]
pub(crate) struct BloomFilter {
    bits: [u64; WORDS],
}

impl BloomFilter {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn positions(val: &impl Hash) -> [usize; 2] {
        let mut hasher = AHasher::default();
        val.hash(&mut hasher);
        let hash = hasher.finish();

        [(hash % BITS) as usize, ((hash >> 32) % BITS) as usize]
    }

    pub(crate) fn add(&mut self, val: &impl Hash) {
        for position in Self::positions(val) {
            self.bits[position / 64] |= 1 << (position % 64);
        }
    }

    #[must_use]
    pub(crate) fn might_contain(&self, val: &impl Hash) -> bool {
        Self::positions(val)
            .into_iter()
            .all(|position| self.bits[position / 64] & (1 << (position % 64)) != 0)
    }
}

impl<'a, T: Hash + 'a> FromIterator<&'a T> for BloomFilter {
    fn from_iter<I: IntoIterator<Item = &'a T>>(iter: I) -> Self {
        let mut filter = Self::new();
        for val in iter {
            filter.add(val);
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::BloomFilter;
    use crate::{InjectionToken, Token};

    #[test]
    fn test_no_false_negatives() {
        let tokens: alloc::vec::Vec<Token> = (0..64).map(|_| Token::from(InjectionToken::new("token"))).collect();
        let filter: BloomFilter = tokens.iter().collect();

        assert!(tokens.iter().all(|token| filter.might_contain(token)));
    }

    #[test]
    fn test_empty_filter() {
        let filter = BloomFilter::new();

        assert!(!filter.might_contain(&Token::from(InjectionToken::new("token"))));
    }

    #[test]
    fn test_mostly_rejects_absent() {
        let filter: BloomFilter = [Token::from(InjectionToken::new("a")), Token::from(InjectionToken::new("b"))]
            .iter()
            .collect();
        let absent = (0..100)
            .map(|_| Token::from(InjectionToken::new("absent")))
            .filter(|token| !filter.might_contain(token))
            .count();

        assert!(absent > 90);
    }
}
