// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn prefix_match_respects_component_boundaries() {
    assert!(is_component_prefix("/a/b", "/a/b/file.mkv"));
    assert!(is_component_prefix("/a/b", "/a/b"));
    assert!(!is_component_prefix("/a/b", "/a/b2/file.mkv"));
    assert!(!is_component_prefix("/a/b", "/a"));
    assert!(!is_component_prefix("", "/a"));
}

#[test]
fn trailing_slash_on_prefix_is_tolerated() {
    assert!(is_component_prefix("/media/tv/", "/media/tv/show/s01e01.mkv"));
}

#[test]
fn longest_match_wins() {
    let paths = vec![
        ScanPath::builder().id(1).local_path("/media").arr_path("/data").build(),
        ScanPath::builder().id(2).local_path("/media/tv").arr_path("/data/tv").build(),
        ScanPath::builder()
            .id(3)
            .local_path("/media/tv/anime")
            .arr_path("/data/tv/anime")
            .build(),
    ];
    assert_eq!(longest_match(&paths, "/media/tv/anime/x.mkv").map(|p| p.id), Some(3));
    assert_eq!(longest_match(&paths, "/media/tv/drama/x.mkv").map(|p| p.id), Some(2));
    assert_eq!(longest_match(&paths, "/media/movies/x.mkv").map(|p| p.id), Some(1));
    assert_eq!(longest_match(&paths, "/srv/other/x.mkv").map(|p| p.id), None);
}

#[test]
fn sibling_directory_with_shared_prefix_does_not_match() {
    let paths =
        vec![ScanPath::builder().id(1).local_path("/media/tv").arr_path("/data/tv").build()];
    assert_eq!(longest_match(&paths, "/media/tv2/x.mkv"), None);
}

#[test]
fn builder_defaults() {
    let path = ScanPath::builder().build();
    assert!(path.enabled);
    assert!(path.auto_remediate);
    assert!(!path.dry_run);
    assert_eq!(path.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(path.verification_timeout_hours, None);
}
