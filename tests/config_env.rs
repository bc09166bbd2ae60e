// tests/config_env.rs
//
// Settings and source loading from the process environment. These tests
// mutate env vars, so they run serially.

use serial_test::serial;
use std::path::PathBuf;

use listing_watch::config::{load_sources_default, load_sources_from, Settings};
use listing_watch::sites::AdapterKind;

const VARS: [&str; 9] = [
    "WATCH_DB_PATH",
    "WATCH_SOURCES_PATH",
    "WATCH_INTERVAL_SECS",
    "WATCH_SOURCE_TIMEOUT_SECS",
    "WATCH_OWNER_ID",
    "WATCH_HTTP_ADDR",
    "WATCH_TELEGRAM_TOKEN",
    "WATCH_CHAT_IDS",
    "WATCH_LOG_JSON",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn defaults_when_unset() {
    clear_env();
    let s = Settings::from_env();
    assert_eq!(s, Settings::default());
    assert_eq!(s.db_path, PathBuf::from("data/listing_watch.db"));
    assert_eq!(s.interval_secs, 60);
    assert!(s.telegram_token.is_none());
}

#[test]
#[serial]
fn reads_overrides_and_ignores_junk_numbers() {
    clear_env();
    std::env::set_var("WATCH_DB_PATH", "/tmp/w.db");
    std::env::set_var("WATCH_INTERVAL_SECS", "15");
    std::env::set_var("WATCH_SOURCE_TIMEOUT_SECS", "soon");
    std::env::set_var("WATCH_OWNER_ID", "42");
    std::env::set_var("WATCH_TELEGRAM_TOKEN", "  ");
    std::env::set_var("WATCH_CHAT_IDS", "100 -200");
    std::env::set_var("WATCH_LOG_JSON", "1");

    let s = Settings::from_env();
    assert_eq!(s.db_path, PathBuf::from("/tmp/w.db"));
    assert_eq!(s.interval_secs, 15);
    assert_eq!(s.source_timeout_secs, 90);
    assert_eq!(s.owner_id, 42);
    assert!(s.telegram_token.is_none(), "blank token counts as unset");
    assert_eq!(s.chat_ids, vec![100, -200]);
    assert!(s.log_json);
    clear_env();
}

#[test]
#[serial]
fn sources_path_override_wins() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("sources.toml");
    std::fs::write(&p, include_str!("fixtures/sources.toml")).unwrap();
    std::env::set_var("WATCH_SOURCES_PATH", &p);

    let sources = load_sources_default().unwrap();
    let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Shop", "Broken"]);
    assert!(sources.iter().all(|s| s.adapter == AdapterKind::Generic));
    clear_env();
}

#[test]
#[serial]
fn missing_override_is_an_error() {
    clear_env();
    std::env::set_var("WATCH_SOURCES_PATH", "/definitely/not/here.toml");
    assert!(load_sources_default().is_err());
    clear_env();
}

#[test]
fn shipped_sources_file_parses() {
    let sources = load_sources_from(std::path::Path::new("config/sources.toml")).unwrap();
    let kinds: Vec<_> = sources.iter().map(|s| s.adapter).collect();
    assert_eq!(
        kinds,
        vec![AdapterKind::Olx, AdapterKind::Shafa, AdapterKind::Liberby, AdapterKind::Izi]
    );
    assert!(sources[1].descriptor.full_text_field.is_some());
}
