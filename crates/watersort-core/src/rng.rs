//! Deterministic 64-bit PRNG for reproducible generation.
//!
//! Every stochastic choice in the generator draws from this type and nothing
//! else, so a seed fully determines the emitted maps.

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fallback for a zero seed; an all-zero state would lock the generator.
const FALLBACK_SEED: u64 = 0xB_ADC0_FFEE;

/// Xorshift-with-multiply generator. Same seed, same sequence.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Explicit seeding; a zero seed falls back to a fixed nonzero constant.
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: if seed == 0 { FALLBACK_SEED } else { seed },
        }
    }

    /// Entropy-seeded, for callers that don't need reproducibility.
    pub fn from_entropy() -> Self {
        let mut bytes = [0u8; 8];
        if getrandom::getrandom(&mut bytes).is_err() {
            // Fallback: a process-local counter still yields distinct streams.
            use std::sync::atomic::{AtomicU64, Ordering};
            static COUNTER: AtomicU64 = AtomicU64::new(1);
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            bytes = n.to_le_bytes();
        }
        Self::seeded(u64::from_le_bytes(bytes))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state.rotate_left(7);
        self.state ^= self.state >> 9;
        self.state.wrapping_mul(GOLDEN_GAMMA)
    }

    /// Uniform integer in `lo..=hi`. Degenerate ranges return `lo`.
    pub fn irange(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as u64;
        lo + (self.next_u64() % span) as usize
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.irange(0, i);
            slice.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::seeded(0xA17C_3B5E_CAFE_BEEF);
        let mut b = Rng::seeded(0xA17C_3B5E_CAFE_BEEF);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Rng::seeded(1);
        let mut b = Rng::seeded(2);
        let same = (0..16).filter(|_| a.next_u64() == b.next_u64()).count();
        assert_eq!(same, 0);
    }

    #[test]
    fn zero_seed_uses_fallback() {
        let mut zero = Rng::seeded(0);
        let mut fallback = Rng::seeded(FALLBACK_SEED);
        assert_eq!(zero.next_u64(), fallback.next_u64());
    }

    #[test]
    fn irange_stays_inclusive() {
        let mut rng = Rng::seeded(42);
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..1000 {
            let v = rng.irange(3, 7);
            assert!((3..=7).contains(&v));
            seen_lo |= v == 3;
            seen_hi |= v == 7;
        }
        assert!(seen_lo && seen_hi);
        assert_eq!(rng.irange(5, 5), 5);
        assert_eq!(rng.irange(9, 2), 9);
    }

    #[test]
    fn shuffle_preserves_elements() {
        let mut rng = Rng::seeded(7);
        let mut v: Vec<usize> = (0..20).collect();
        rng.shuffle(&mut v);
        let mut sorted = v.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
