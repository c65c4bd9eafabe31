//! Shared proptest configuration
//!
//! Case counts follow the active [`crate::tier::Tier`]; `PROPTEST_CASES` overrides it.
//!
//! ```no_run
//! use accessd_test_fixtures::proptest_config::test_cases;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #![proptest_config(ProptestConfig::with_cases(test_cases()))]
//!
//!     #[test]
//!     fn holds(input in any::<u32>()) {
//!         prop_assert!(input.checked_add(0).is_some());
//!     }
//! }
//! ```

pub use proptest::test_runner::Config;

use crate::tier;

pub const DEFAULT_PROPTEST_CASES: u32 = tier::current_tier().proptest_cases();

/// Case count from `PROPTEST_CASES`, or the tier default when unset or unparsable
#[must_use]
pub fn test_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES)
}

/// Config for `TestRunner` driven tests
#[must_use]
pub fn proptest_config() -> Config {
    Config::with_cases(test_cases())
}
