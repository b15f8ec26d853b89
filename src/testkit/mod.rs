//! Shared test utilities.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (external soak tooling).
//!
//! - [`mock_feed`]: deterministic random-walk BBO generator for
//!   exercising the matrix without any venue connectivity.

pub mod mock_feed;

pub use mock_feed::MockFeed;
