//! Release and build-time information
//!
//! Values come from `DASHBOARD_*` variables set when the binary is compiled,
//! falling back to the crate version and local defaults.

use serde::Serialize;

/// Fixed name of the application, regardless of the executable name
pub const APPLICATION: &str = "dashboard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub application: &'static str,
    pub version: &'static str,
    pub arch: &'static str,
    #[serde(rename = "build-date")]
    pub build_date: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
}

impl BuildInfo {
    #[must_use]
    pub fn current() -> Self {
        BuildInfo {
            application: APPLICATION,
            version: option_env!("DASHBOARD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")),
            arch: option_env!("DASHBOARD_ARCH").unwrap_or(std::env::consts::ARCH),
            build_date: option_env!("DASHBOARD_BUILD_DATE").unwrap_or("unknown"),
            commit: option_env!("DASHBOARD_COMMIT").unwrap_or("00000000"),
            branch: option_env!("DASHBOARD_BRANCH").unwrap_or("main"),
        }
    }

    /// Human readable, multi-line description used by `dashboard version`
    #[must_use]
    pub fn text(&self) -> String {
        format!(
            "{} {}\n  built for {} on {}\n  commit {} on branch {}\n",
            self.application, self.version, self.arch, self.build_date, self.commit, self.branch
        )
    }
}

/// Name of the running executable, e.g. when invoked through a symlink
#[must_use]
pub fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| APPLICATION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_has_application_name() {
        let build = BuildInfo::current();
        assert_eq!(build.application, "dashboard");
        assert!(!build.version.is_empty());
        assert!(!build.arch.is_empty());
    }

    #[test]
    fn test_text_output() {
        let build = BuildInfo {
            application: "dashboard",
            version: "v1.2.3",
            arch: "amd64",
            build_date: "2024-07-01 00:00:00",
            commit: "abcdef12",
            branch: "main",
        };
        assert_eq!(
            build.text(),
            "dashboard v1.2.3\n  built for amd64 on 2024-07-01 00:00:00\n  commit abcdef12 on branch main\n"
        );
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(BuildInfo::current()).unwrap();
        for key in ["application", "version", "arch", "build-date", "commit", "branch"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
