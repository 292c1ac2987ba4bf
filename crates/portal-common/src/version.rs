//! ---
//! portal_section: "01-core-functionality"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Shared primitives and utilities for the portal runtime."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use serde::Serialize;

/// Build metadata reported by `--version` and the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// Git commit hash when provided at build time through `PORTAL_GIT_SHA`.
    pub git_sha: String,
    /// Cargo profile used during compilation.
    pub profile: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("PORTAL_GIT_SHA").unwrap_or("UNKNOWN").to_owned(),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    /// Concise string combining semantic version and git hash.
    #[must_use]
    pub fn cli_string(&self) -> String {
        format!("{} ({})", self.semver, self.git_sha)
    }

    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "Client Portal v{}\nCommit: {}\nProfile: {}",
            self.semver, self.git_sha, self.profile
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_contains_semver() {
        let info = VersionInfo::current();
        assert!(info.extended().contains(&info.semver));
        assert!(info.cli_string().starts_with(&info.semver));
    }
}
