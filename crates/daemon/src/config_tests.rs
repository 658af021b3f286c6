// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SAMPLE: &str = r#"
state_dir = "/srv/remedarr"
log_filter = "debug"
probe_timeout_secs = 60

[[arr]]
name = "radarr-main"
kind = "radarr"
base_url = "http://radarr:7878"
api_key = "secret"
root = "/data/movies"

[[arr]]
name = "sonarr-main"
kind = "sonarr"
base_url = "http://sonarr:8989"
api_key = "secret"
root = "/data/tv"

[verification]
interval_secs = 15
timeout_hours = 2

[retries]
default_max = 5
base_delay_mins = 10

[scanner]
write_settle_secs = 300
throttle_threshold = 20
throttle_delay_secs = 10

[rescan]
tick_secs = 60
batch = 10

[recovery]
stale_threshold_hours = 12
"#;

#[test]
fn full_file_round_trips_into_engine_config() {
    let config: Config = toml::from_str(SAMPLE).unwrap();
    assert_eq!(config.state_dir, PathBuf::from("/srv/remedarr"));
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.arr.len(), 2);
    assert_eq!(config.arr[0].arr_kind(), Some(remedarr_adapters::ArrKind::Radarr));
    assert_eq!(config.arr[1].arr_kind(), Some(remedarr_adapters::ArrKind::Sonarr));

    let engine = config.engine_config();
    assert_eq!(engine.verifier.interval, Duration::from_secs(15));
    assert_eq!(engine.verifier.timeout, Duration::from_secs(2 * 3600));
    assert_eq!(engine.monitor.default_max_retries, 5);
    assert_eq!(engine.monitor.base_delay, Duration::from_secs(600));
    assert_eq!(engine.scanner.write_settle_window, Duration::from_secs(300));
    assert_eq!(engine.scanner.throttle_threshold, 20);
    assert_eq!(engine.recovery.stale_threshold, Duration::from_secs(12 * 3600));
    assert_eq!(engine.rescan.batch, 10);
}

#[test]
fn empty_config_uses_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.state_dir, PathBuf::from("/var/lib/remedarr"));
    assert_eq!(config.verification.interval_secs, 30);
    assert_eq!(config.retries.default_max, 3);
    assert!(config.arr.is_empty());
    assert_eq!(config.database_path(), PathBuf::from("/var/lib/remedarr/remedarr.sqlite3"));
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(toml::from_str::<Config>("surprise = 1").is_err());
}

#[test]
fn unknown_arr_kind_is_none() {
    let instance = ArrInstance {
        name: "x".into(),
        kind: "lidarr".into(),
        base_url: "http://x".into(),
        api_key: "k".into(),
        root: "/data/music".into(),
    };
    assert_eq!(instance.arr_kind(), None);
}

#[test]
fn missing_file_loads_defaults() {
    let config = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap();
    assert_eq!(config.log_filter, "info");
}
