//! Configuration for the Felt engine.

/// Configuration for the Felt engine.
///
/// Controls how non-fatal conditions are handled and how the helper RNG is
/// seeded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeltConfig {
    /// Promote non-fatal conditions (unrecognized effect types, malformed
    /// simple clauses, rule text without rule names) to errors.
    pub strict: bool,

    /// Seed for the deterministic RNG returned by [`crate::Felt::rng`].
    pub rng_seed: u64,
}

impl FeltConfig {
    /// Creates a configuration with strict checking enabled.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Builder method to set strict checking.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder method to set the RNG seed.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }
}
