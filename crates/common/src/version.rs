use std::fmt;

use serde::Serialize;

/// Build metadata baked in by the binary's build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
}

impl BuildInfo {
    pub const fn new(
        build_profile: &'static str,
        build_features: &'static str,
        version: &'static str,
        build_timestamp: &'static str,
        rust_version: &'static str,
    ) -> Self {
        Self {
            build_profile,
            build_features,
            version,
            build_timestamp,
            rust_version,
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} build, features: {}, built {} with {})",
            self.version,
            self.build_profile,
            self.build_features,
            self.build_timestamp,
            self.rust_version
        )
    }
}

/// Expands to a [`BuildInfo`] read from the calling crate's build-time
/// environment. Missing variables read as `unknown`.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo::new(
            option_env!("BUILD_PROFILE").unwrap_or("unknown"),
            option_env!("BUILD_FEATURES").unwrap_or("unknown"),
            option_env!("REPO_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")),
            option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            option_env!("RUST_VERSION").unwrap_or("unknown"),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let info = BuildInfo::new("release", "none", "v0.1.0-3-gabc", "2024-01-01", "rustc 1.80");
        assert_eq!(
            info.to_string(),
            "v0.1.0-3-gabc (release build, features: none, built 2024-01-01 with rustc 1.80)"
        );
    }

    #[test]
    fn test_macro_falls_back_to_package_version() {
        let info = crate::build_info!();
        assert!(!info.version.is_empty());
    }
}
