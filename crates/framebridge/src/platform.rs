//! Platform version pass-through.

use std::fs;

/// Human-readable description of the host platform.
///
/// Prefers the os-release pretty name where one exists, otherwise falls back
/// to the compile-time OS and architecture. Never fails.
pub fn platform_version() -> String {
    os_release_pretty_name().unwrap_or_else(|| {
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
    })
}

fn os_release_pretty_name() -> Option<String> {
    let contents = fs::read_to_string("/etc/os-release").ok()?;
    parse_pretty_name(&contents)
}

fn parse_pretty_name(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let value = line.strip_prefix("PRETTY_NAME=")?;
        let trimmed = value.trim().trim_matches('"');
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
