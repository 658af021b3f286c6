// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media-file eligibility rules for the scanner.
//!
//! Only recognized video container extensions are scanned, and a number of
//! name patterns are always excluded: partial downloads, extraction debris,
//! samples and trailers. Exclusions run on the file name alone.

use std::path::Path;

/// Recognized media container extensions (lowercase, without the dot).
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "m2ts", "vob",
    "3gp", "ogv", "divx", "xvid",
];

/// Suffixes that mark an in-flight or temporary download.
const PARTIAL_SUFFIXES: &[&str] = &[".tmp", ".temp", ".part", ".partial", ".!qb"];

/// Does the path carry a recognized media extension?
pub fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Is the file name excluded regardless of extension?
pub fn is_excluded_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();

    // Dotfiles, including .fuse_hidden* rename droppings
    if lower.starts_with('.') {
        return true;
    }
    if lower.starts_with("__") {
        return true;
    }
    if PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return true;
    }
    if lower.contains(".nzb") || lower.ends_with(".nzbget") {
        return true;
    }
    if contains_sample_token(&lower) {
        return true;
    }
    if lower.contains("-trailer") || lower.contains(".trailer.") {
        return true;
    }
    false
}

/// True if `lower` contains "sample" as a token: an occurrence not
/// immediately followed by `r`, so "sampler" on its own never matches.
fn contains_sample_token(lower: &str) -> bool {
    let needle = "sample";
    let mut from = 0;
    while let Some(pos) = lower[from..].find(needle) {
        let end = from + pos + needle.len();
        if lower.as_bytes().get(end) != Some(&b'r') {
            return true;
        }
        from = end;
    }
    false
}

/// Full eligibility check: recognized extension and not excluded by name.
pub fn is_eligible_media_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    has_media_extension(path) && !is_excluded_name(name)
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
