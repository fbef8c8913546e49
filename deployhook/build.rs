//! Stamps the deployhook binary with the commit and time it was built from,
//! reported by `deployhook --version`.

use chrono::{SecondsFormat, Utc};
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let commit = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some();
    let built_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    println!("cargo:rustc-env=DEPLOYHOOK_COMMIT={}", commit);
    println!("cargo:rustc-env=DEPLOYHOOK_DIRTY={}", dirty);
    println!("cargo:rustc-env=DEPLOYHOOK_BUILT_AT={}", built_at);

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}
