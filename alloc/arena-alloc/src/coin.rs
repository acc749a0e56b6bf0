//! Injectable randomness for freelist node heights.
//!
//! Node heights follow a geometric distribution: keep flipping a fair coin
//! and growing while it lands heads. The flip source is a trait so that
//! deterministic sequences can be supplied where reproducible block placement
//! matters (tests, differential debugging of persistent arenas).

/// A source of fair coin flips.
pub trait CoinFlip {
    /// Flips once; `true` is heads.
    fn flip(&mut self) -> bool;
}

/// The default flip source, backed by a seeded [`fastrand::Rng`].
///
/// Seeding is explicit: the same seed yields the same placement decisions,
/// which keeps arenas reproducible run-to-run.
#[derive(Debug, Clone)]
pub struct RandomCoin(fastrand::Rng);

impl RandomCoin {
    /// Creates a flip source from an explicit seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self(fastrand::Rng::with_seed(seed))
    }
}

impl Default for RandomCoin {
    fn default() -> Self {
        Self::with_seed(0x853C_49E6_748F_EA9B)
    }
}

impl CoinFlip for RandomCoin {
    fn flip(&mut self) -> bool {
        self.0.bool()
    }
}
