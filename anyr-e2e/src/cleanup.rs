//! Deferred deletion of remote fixtures
//!
//! Every resource a test creates is registered here right after creation.
//! Releases run newest-first when the stack is dropped, on normal return and
//! during a panic alike, so dependents are deleted before their dependencies.

use crate::harness::E2eHarness;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};

/// A single deferred CLI invocation
#[derive(Debug, Clone)]
struct Release {
    label: String,
    args: Vec<String>,
}

/// LIFO stack of best-effort delete commands
#[derive(Debug)]
pub struct CleanupStack<'h> {
    harness: &'h E2eHarness,
    releases: Vec<Release>,
}

impl<'h> CleanupStack<'h> {
    pub fn new(harness: &'h E2eHarness) -> Self {
        Self {
            harness,
            releases: Vec::new(),
        }
    }

    /// Register a command that deletes the resource named by `label`
    pub fn defer(&mut self, label: impl Into<String>, args: &[&str]) {
        let release = Release {
            label: label.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        debug!("deferred cleanup of {}", release.label);
        self.releases.push(release);
    }

    /// Number of releases still pending
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Run every pending release, newest first, and return how many
    /// succeeded. Failures are logged and never stop the remaining ones.
    pub fn release_all(&mut self) -> usize {
        let mut succeeded = 0;
        while let Some(release) = self.releases.pop() {
            let args: Vec<&str> = release.args.iter().map(String::as_str).collect();
            match self.harness.run_cli_blocking(&args) {
                Ok(output) if output.success() => {
                    debug!("cleaned up {}", release.label);
                    succeeded += 1;
                }
                Ok(output) => warn!(
                    "cleanup of {} exited with {}: {}",
                    release.label,
                    output.exit_code,
                    output.stderr.trim()
                ),
                Err(e) => warn!("cleanup of {} failed: {}", release.label, e),
            }
        }
        succeeded
    }
}

impl Drop for CleanupStack<'_> {
    fn drop(&mut self) {
        // Releases block on their child processes. A multi-threaded runtime
        // gets its worker handed off first; elsewhere blocking is fine.
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| {
                    self.release_all();
                });
            }
            _ => {
                self.release_all();
            }
        }
    }
}
