// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=VIRTUAL_WINDOW_VERSION");

    // Packagers can pin the version string
    let version = match std::env::var("VIRTUAL_WINDOW_VERSION") {
        Ok(v) if !v.is_empty() => v,
        _ => build_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// "<crate version>-<short hash>", or the bare crate version outside a checkout
fn build_version() -> String {
    let crate_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());
    match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|status| !status.is_empty());
            if dirty {
                format!("{}-dirty-{}", crate_version, hash)
            } else {
                format!("{}-{}", crate_version, hash)
            }
        }
        None => crate_version,
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
