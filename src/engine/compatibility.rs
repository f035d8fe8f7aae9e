//! Per-command argument compatibility for engine versions.

use semver::{Version, VersionReq};

/// Flags that stop being valid for `command` once the engine matches `since`.
struct Rule {
    commands: &'static [&'static str],
    since: &'static str,
    invalid: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        commands: &["init"],
        since: ">=0.15.0",
        invalid: &["-get-plugins", "-verify-plugins", "-lock"],
    },
    Rule {
        commands: &["output"],
        since: ">=0.15.0",
        invalid: &["-module"],
    },
    Rule {
        commands: &["plan", "apply", "destroy"],
        since: ">=1.0.0",
        invalid: &["-allow-missing-config"],
    },
];

/// Compatibility table bound to a detected engine version.
#[derive(Debug, Clone, Default)]
pub struct Compatibility {
    version: Option<Version>,
}

impl Compatibility {
    pub fn new(version: Option<Version>) -> Self {
        Self { version }
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Flags that must not be forwarded to `command`.
    ///
    /// Pre-releases are judged by their release triple, so `1.6.0-beta1`
    /// follows the `1.6.0` rules.
    pub fn invalid_args(&self, command: &str) -> Vec<&'static str> {
        let Some(ref detected) = self.version else {
            return Vec::new();
        };
        let version = Version::new(detected.major, detected.minor, detected.patch);
        RULES
            .iter()
            .filter(|rule| rule.commands.contains(&command))
            .filter(|rule| {
                VersionReq::parse(rule.since)
                    .map(|req| req.matches(&version))
                    .unwrap_or(false)
            })
            .flat_map(|rule| rule.invalid.iter().copied())
            .collect()
    }

    /// Drop every argument in `args` that is invalid for `command`.
    pub fn filter_args(&self, command: &str, args: &[String]) -> Vec<String> {
        filter_args(args, &self.invalid_args(command))
    }
}

/// Remove `-flag` and `-flag=value` occurrences of the invalid flags.
pub fn filter_args(args: &[String], invalid: &[&str]) -> Vec<String> {
    args.iter()
        .filter(|arg| {
            let flag = arg.split_once('=').map_or(arg.as_str(), |(flag, _)| flag);
            let dropped = invalid.contains(&flag);
            if dropped {
                tracing::debug!(arg = %arg, "dropping argument unsupported by engine version");
            }
            !dropped
        })
        .cloned()
        .collect()
}
