//! Documented command tree of the anyr CLI
//!
//! Every path listed here must answer `--help` with exit code 0. This is a
//! cheap structural check that needs no backend and no credentials.

use crate::harness::{E2eHarness, E2eResult};

/// A top-level command and its documented subcommands
#[derive(Debug, Clone, Copy)]
pub struct CommandGroup {
    pub name: &'static str,
    pub subcommands: &'static [&'static str],
}

impl CommandGroup {
    /// The group itself followed by each `group subcommand` path
    pub fn paths(&self) -> Vec<Vec<&'static str>> {
        std::iter::once(vec![self.name])
            .chain(self.subcommands.iter().map(|sub| vec![self.name, *sub]))
            .collect()
    }
}

pub const COMMAND_TREE: &[CommandGroup] = &[
    CommandGroup { name: "auth", subcommands: &["login", "logout", "status", "token"] },
    CommandGroup { name: "space", subcommands: &["list", "get", "create", "update"] },
    CommandGroup { name: "object", subcommands: &["list", "get", "create", "update", "delete"] },
    CommandGroup { name: "type", subcommands: &["list", "get", "create", "update", "delete"] },
    CommandGroup { name: "property", subcommands: &["list", "get", "create", "update", "delete"] },
    CommandGroup { name: "member", subcommands: &["list", "get"] },
    CommandGroup { name: "tag", subcommands: &["list", "get", "create", "update", "delete"] },
    CommandGroup { name: "template", subcommands: &["list", "get"] },
    CommandGroup { name: "search", subcommands: &[] },
    CommandGroup { name: "list", subcommands: &["objects", "views", "add", "remove"] },
    CommandGroup { name: "config", subcommands: &["show", "set", "reset"] },
];

/// Look up a group by its top-level command name
pub fn group(name: &str) -> Option<&'static CommandGroup> {
    COMMAND_TREE.iter().find(|g| g.name == name)
}

/// A command path whose `--help` did not exit 0
#[derive(Debug, Clone)]
pub struct HelpFailure {
    pub path: String,
    pub exit_code: i32,
    pub stderr: String,
}

impl std::fmt::Display for HelpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path: &str = if self.path.is_empty() { "<top level>" } else { &self.path };
        write!(f, "help failed for {} (exit code {}): {}", path, self.exit_code, self.stderr.trim())
    }
}

/// Run `--help` on every path and collect the ones that fail.
///
/// Paths are checked independently; one broken subcommand does not hide the
/// others.
pub async fn sweep(harness: &E2eHarness, paths: &[Vec<&str>]) -> E2eResult<Vec<HelpFailure>> {
    let mut failures = Vec::new();
    for path in paths {
        let output = harness.run_help(path).await?;
        if !output.success() {
            failures.push(HelpFailure {
                path: path.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
    }
    Ok(failures)
}

/// Assert that every path in the named group answers `--help`
pub async fn assert_group_help_ok(harness: &E2eHarness, name: &str) -> E2eResult<()> {
    let Some(found) = group(name) else {
        panic!("unknown command group {}", name);
    };
    let paths = found.paths();
    let failures = sweep(harness, &paths).await?;
    assert!(
        failures.is_empty(),
        "{} of {} help checks failed:\n{}",
        failures.len(),
        paths.len(),
        failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("\n")
    );
    Ok(())
}
