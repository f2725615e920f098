//! Environment resolution for CLI invocations
//!
//! Tests point the CLI at a disposable key file and a sandbox backend through
//! `ANYTYPE_TEST_*` overrides. Everything here works on a snapshot of the
//! ambient environment; process state is never mutated.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Explicit path to the CLI under test
pub const BIN_ENV: &str = "ANYR_BIN";

/// Name looked up on `PATH` when `ANYR_BIN` is not set
pub const BIN_NAME: &str = "anyr";

/// Live space the backend tests run against
pub const SPACE_ID_ENV: &str = "ANYTYPE_TEST_SPACE_ID";

/// Optional per-invocation timeout, in whole seconds
pub const TIMEOUT_ENV: &str = "ANYR_TEST_TIMEOUT_SECS";

/// `(override, target)` pairs. A non-empty override replaces the target in
/// the child environment.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ANYTYPE_TEST_KEY_FILE", "ANYTYPE_KEY_FILE"),
    ("ANYTYPE_TEST_URL", "ANYTYPE_URL"),
];

/// Environment mapping handed to a child process. Names and values are kept
/// as raw OS strings so non-UTF-8 entries reach the child unchanged.
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Build the child environment from the ambient one.
///
/// Returns a fresh copy of `ambient` where every override that is present and
/// non-empty has been written over its target variable.
pub fn resolve_env(ambient: &EnvMap) -> EnvMap {
    let mut env = ambient.clone();
    for (override_var, target_var) in ENV_OVERRIDES {
        if let Some(value) = non_empty(ambient, override_var) {
            env.insert(OsString::from(target_var), value.to_os_string());
        }
    }
    env
}

fn non_empty<'a>(vars: &'a EnvMap, key: &str) -> Option<&'a OsStr> {
    vars.get(OsStr::new(key))
        .map(OsString::as_os_str)
        .filter(|v| !v.is_empty())
}

/// Like [`non_empty`], for settings the harness itself has to read as text
fn non_empty_str<'a>(vars: &'a EnvMap, key: &str) -> Option<&'a str> {
    let value = non_empty(vars, key)?;
    let text = value.to_str();
    if text.is_none() {
        warn!("Ignoring {}: value is not valid UTF-8", key);
    }
    text
}

/// Settings for one harness, captured once from an environment snapshot
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Resolved CLI binary, if any
    pub bin: Option<PathBuf>,
    /// Target space for backend tests
    pub space_id: Option<String>,
    /// Kill invocations that run longer than this
    pub timeout: Option<Duration>,
    /// Ambient variables the child environment is resolved from
    pub ambient: EnvMap,
}

impl HarnessConfig {
    /// Snapshot the current process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Build a config from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let ambient: EnvMap = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let bin = non_empty(&ambient, BIN_ENV)
            .map(PathBuf::from)
            .or_else(|| find_on_path(&ambient));
        let space_id = non_empty_str(&ambient, SPACE_ID_ENV).map(str::to_string);
        let timeout = non_empty_str(&ambient, TIMEOUT_ENV).and_then(parse_timeout);

        Self {
            bin,
            space_id,
            timeout,
            ambient,
        }
    }

    /// Environment every invocation of the CLI runs with
    pub fn child_env(&self) -> EnvMap {
        resolve_env(&self.ambient)
    }
}

/// Search the snapshot's `PATH`, not the live process one
fn find_on_path(ambient: &EnvMap) -> Option<PathBuf> {
    let path = ambient.get(OsStr::new("PATH"))?;
    let cwd = std::env::current_dir().unwrap_or_default();
    which::which_in(BIN_NAME, Some(path), cwd).ok()
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", TIMEOUT_ENV, raw, e);
            None
        }
    }
}
