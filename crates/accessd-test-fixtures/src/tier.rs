//! Test tier selection
//!
//! | Tier     | Feature Flag  | Proptest Cases | Use Case                    |
//! |----------|---------------|----------------|-----------------------------|
//! | Fast     | `test-fast`   | 10             | Pre-commit, quick PR checks |
//! | Standard | (default)     | 64             | Regular CI, local dev       |
//! | Full     | `test-full`   | 512            | Nightly runs                |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Standard,
    Full,
}

impl Tier {
    #[must_use]
    pub const fn proptest_cases(self) -> u32 {
        match self {
            Self::Fast => 10,
            Self::Standard => 64,
            Self::Full => 512,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Full => "full",
        }
    }

    /// Concurrent callers to spawn in stress-style tests
    #[must_use]
    pub const fn concurrency(self) -> usize {
        match self {
            Self::Fast => 16,
            Self::Standard => 50,
            Self::Full => 200,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Active tier; `test-full` wins if both features are enabled
#[must_use]
pub const fn current_tier() -> Tier {
    if cfg!(feature = "test-full") {
        Tier::Full
    } else if cfg!(feature = "test-fast") {
        Tier::Fast
    } else {
        Tier::Standard
    }
}
