// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    mkv = { "show.mkv" },
    mp4 = { "movie.mp4" },
    upper = { "MOVIE.MKV" },
    m2ts = { "bluray.m2ts" },
    divx = { "old.divx" },
)]
fn recognized_extensions(name: &str) {
    assert!(has_media_extension(Path::new(name)));
}

#[parameterized(
    subtitle = { "show.srt" },
    nfo = { "movie.nfo" },
    none = { "README" },
    archive = { "bundle.rar" },
)]
fn unrecognized_extensions(name: &str) {
    assert!(!has_media_extension(Path::new(name)));
}

#[parameterized(
    dotfile = { ".hidden.mkv" },
    fuse_hidden = { ".fuse_hidden000abc12" },
    tmp = { "show.mkv.tmp" },
    temp = { "show.temp" },
    part = { "movie.mkv.part" },
    partial = { "movie.partial" },
    qbittorrent = { "movie.mkv.!qb" },
    double_underscore = { "__packed.mkv" },
    nzb = { "movie.nzb.queued.mkv" },
    nzbget = { "job.nzbget" },
    sample = { "movie-sample.mkv" },
    sample_dir_style = { "sample.mkv" },
    trailer_dash = { "movie-trailer.mkv" },
    trailer_dot = { "movie.trailer.mkv" },
)]
fn excluded_names(name: &str) {
    assert!(is_excluded_name(name));
}

#[parameterized(
    plain = { "The.Movie.2019.1080p.mkv" },
    sampler = { "the.sampler.s01e01.mkv" },
    trailer_in_title = { "trailerpark.boys.s01e01.mkv" },
)]
fn allowed_names(name: &str) {
    assert!(!is_excluded_name(name));
}

#[test]
fn sampler_and_sample_in_one_name_is_excluded() {
    assert!(is_excluded_name("sampler-sample.mkv"));
}

#[test]
fn eligibility_combines_extension_and_name() {
    assert!(is_eligible_media_file(Path::new("/media/tv/show.s01e01.mkv")));
    assert!(!is_eligible_media_file(Path::new("/media/tv/show.s01e01.srt")));
    assert!(!is_eligible_media_file(Path::new("/media/tv/.show.s01e01.mkv")));
    assert!(!is_eligible_media_file(Path::new("/media/tv/show-sample.mkv")));
}
