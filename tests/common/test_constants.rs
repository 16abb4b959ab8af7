//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Instance identifier used across scenarios.
pub const INSTANCE_ID: &str = "123";

/// Region used across scenarios.
pub const LOCATION: &str = "eastus";

/// Resource group used across scenarios.
pub const RESOURCE_GROUP: &str = "rg-web";

/// First shard account for [`INSTANCE_ID`] in [`LOCATION`].
pub const FIRST_ACCOUNT: &str = "oostg123eus01";
