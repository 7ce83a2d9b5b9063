//! Build script for textlens CLI
//!
//! Records build metadata shown by `textlens version`

use std::env;
use std::process::Command;

/// Commit hash from GIT_COMMIT_HASH, else from the local checkout
fn commit_hash() -> String {
    if let Ok(hash) = env::var("GIT_COMMIT_HASH") {
        return hash;
    }
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");
    println!(
        "cargo:rustc-env=BUILT_HOST={}",
        env::var("HOST").unwrap_or_else(|_| "unknown".to_string())
    );
    println!("cargo:rustc-env=BUILT_GIT_COMMIT_HASH={}", commit_hash());
    println!(
        "cargo:rustc-env=BUILT_TIME_UTC={}",
        chrono::Utc::now().to_rfc3339()
    );
}
