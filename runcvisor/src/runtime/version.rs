//! Runtime version banner.

use serde::{Deserialize, Serialize};

/// Versions reported by `<runtime> --version`. Fields are empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Runtime release, e.g. `1.1.12`.
    pub runtime: String,
    pub commit: String,
    /// OCI runtime spec version the runtime implements.
    pub spec: String,
}

/// Parse the banner printed by `--version`.
///
/// The first line must read `<name> version <release>`; otherwise nothing is
/// trusted and every field stays empty.
pub fn parse_version(output: &str) -> Version {
    let mut lines = output.lines();

    let runtime = match lines.next().map(str::split_whitespace) {
        Some(mut words) => match (words.next(), words.next(), words.next()) {
            (Some(_name), Some("version"), Some(release)) => release.to_string(),
            _ => return Version::default(),
        },
        None => return Version::default(),
    };

    let mut version = Version {
        runtime,
        ..Default::default()
    };
    for line in lines {
        if let Some(commit) = line.strip_prefix("commit:") {
            version.commit = commit.trim().to_string();
        } else if let Some(spec) = line.strip_prefix("spec:") {
            version.spec = spec.trim().to_string();
        }
    }
    version
}
