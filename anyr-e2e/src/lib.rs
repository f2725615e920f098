//! End-to-end testing harness for anyr
//!
//! This crate drives the anyr CLI as an external binary against a live
//! Anytype backend. It handles binary discovery, environment overrides for
//! test credentials and endpoints, the `--json` output contract, and
//! guaranteed cleanup of remote fixtures.

pub mod cleanup;
pub mod env;
pub mod harness;
pub mod help;
pub mod lifecycle;
pub mod output;

pub use cleanup::CleanupStack;
pub use env::HarnessConfig;
pub use harness::{CommandOutput, E2eError, E2eHarness, E2eResult, init_tracing};
pub use lifecycle::{CreatedIds, Fixtures, run_resource_lifecycle};
pub use output::{Entity, Listing};
