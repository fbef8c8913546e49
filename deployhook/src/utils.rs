//! Build metadata

use serde::Serialize;

/// What `deployhook --version` prints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: String,
    pub commit: &'static str,
    /// Built from a working tree with uncommitted changes
    pub dirty: bool,
    pub built_at: &'static str,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: option_env!("DEPLOYHOOK_COMMIT").unwrap_or("unknown"),
        dirty: option_env!("DEPLOYHOOK_DIRTY") == Some("true"),
        built_at: option_env!("DEPLOYHOOK_BUILT_AT").unwrap_or("unknown"),
    }
}
