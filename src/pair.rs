//! Broad-Phase Pairs
//!
//! A `Pair` names two bodies whose AABBs overlap this tick. The key is an
//! explicit ordered `(a, b)` with `a < b`; its derived lexicographic order
//! is the total order the broad-phase sort and merge-diff rely on (the same
//! ordering a packed 64-bit key would give, without the type punning).

use crate::contact::ManifoldId;

/// Canonical body-pair identity, `body_a < body_b`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    /// Smaller body index
    pub body_a: u32,
    /// Larger body index
    pub body_b: u32,
}

impl PairKey {
    /// Create a canonical pair key (orders the two indices)
    #[inline]
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        debug_assert_ne!(a, b, "a body cannot pair with itself");
        if a < b {
            Self {
                body_a: a as u32,
                body_b: b as u32,
            }
        } else {
            Self {
                body_a: b as u32,
                body_b: a as u32,
            }
        }
    }
}

/// Pair lifecycle relative to the previous tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairPhase {
    /// First tick this pair exists; its manifold was freshly allocated
    New,
    /// Pair persisted from the previous tick; manifold carried forward
    Keep,
}

/// An overlapping body pair with its persistent contact manifold
#[derive(Clone, Copy, Debug)]
pub struct Pair {
    /// Canonical pair identity
    pub key: PairKey,
    /// New this tick, or kept from the previous one
    pub phase: PairPhase,
    /// Handle of the pair's manifold in the arena
    pub manifold: ManifoldId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_canonical_order() {
        let k1 = PairKey::new(7, 3);
        let k2 = PairKey::new(3, 7);
        assert_eq!(k1, k2);
        assert!(k1.body_a < k1.body_b);
    }

    #[test]
    fn test_key_total_order_matches_packed() {
        // Lexicographic (a, b) order equals the order of (a << 32 | b)
        let keys = [
            PairKey::new(0, 1),
            PairKey::new(0, 9),
            PairKey::new(1, 2),
            PairKey::new(1, 500),
            PairKey::new(2, 3),
        ];
        for window in keys.windows(2) {
            assert!(window[0] < window[1]);
            let packed = |k: &PairKey| (u64::from(k.body_a) << 32) | u64::from(k.body_b);
            assert!(packed(&window[0]) < packed(&window[1]));
        }
    }
}
