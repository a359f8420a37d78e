//! Embeds build metadata for `/build_info` and the startup log line
//!
//! Exposes `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` to `env!`.

use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    let metadata = [
        ("GIT_HASH", git_short_hash().unwrap_or_else(|| UNKNOWN.to_string())),
        ("BUILD_TIMESTAMP", build_timestamp()),
        ("BUILD_PROFILE", std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string())),
    ];
    for (key, value) in metadata {
        println!("cargo:rustc-env={}={}", key, value);
    }

    watch_git_head();
}

/// `HEAD` as an 8 character hash; None outside a checkout or without git
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn build_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Re-run when the checked out commit moves
fn watch_git_head() {
    let git_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../.git");
    for entry in ["HEAD", "refs/heads"] {
        println!("cargo:rerun-if-changed={}", git_dir.join(entry).display());
    }
    println!("cargo:rerun-if-changed=build.rs");
}
