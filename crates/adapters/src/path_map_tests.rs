// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_core::scan_path::ScanPath;

fn mapper() -> PathMapper {
    PathMapper::new(&[
        ScanPath::builder().id(1).local_path("/media").arr_path("/data").build(),
        ScanPath::builder().id(2).local_path("/media/tv").arr_path("/data/shows").build(),
    ])
}

#[test]
fn to_arr_uses_longest_local_prefix() {
    let mapper = mapper();
    assert_eq!(
        mapper.to_arr_path("/media/tv/show/e1.mkv").unwrap(),
        "/data/shows/show/e1.mkv"
    );
    assert_eq!(mapper.to_arr_path("/media/movies/film.mkv").unwrap(), "/data/movies/film.mkv");
}

#[test]
fn to_local_uses_longest_arr_prefix() {
    let mapper = mapper();
    assert_eq!(
        mapper.to_local_path("/data/shows/show/e1.mkv").unwrap(),
        "/media/tv/show/e1.mkv"
    );
    assert_eq!(mapper.to_local_path("/data/movies/film.mkv").unwrap(), "/media/movies/film.mkv");
}

#[test]
fn component_boundary_is_respected() {
    let mapper = PathMapper::new(&[ScanPath::builder()
        .id(1)
        .local_path("/media/tv")
        .arr_path("/data/tv")
        .build()]);
    assert!(mapper.to_arr_path("/media/tv2/x.mkv").is_err());
    assert!(mapper.to_local_path("/data/tv2/x.mkv").is_err());
}

#[test]
fn unmapped_path_errors() {
    let mapper = mapper();
    let err = mapper.to_arr_path("/srv/other.mkv").unwrap_err();
    assert!(matches!(err, AdapterError::NoMapping(_)));
}

#[test]
fn reload_replaces_table() {
    let mapper = mapper();
    mapper.reload(&[ScanPath::builder().id(9).local_path("/mnt/pool").arr_path("/pool").build()]);
    assert!(mapper.to_arr_path("/media/tv/x.mkv").is_err());
    assert_eq!(mapper.to_arr_path("/mnt/pool/x.mkv").unwrap(), "/pool/x.mkv");
}

#[test]
fn trailing_slashes_in_config_are_normalized() {
    let mapper = PathMapper::new(&[ScanPath::builder()
        .id(1)
        .local_path("/media/tv/")
        .arr_path("/data/tv/")
        .build()]);
    assert_eq!(mapper.to_arr_path("/media/tv/x.mkv").unwrap(), "/data/tv/x.mkv");
}
