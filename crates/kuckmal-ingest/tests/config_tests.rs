//! Environment-driven configuration
//!
//! These tests mutate process environment variables and run serially.

use kuckmal_ingest::IngestConfig;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

const VARS: &[&str] = &[
    "KUCKMAL_DATABASE_PATH",
    "KUCKMAL_WORK_DIR",
    "KUCKMAL_BATCH_SIZE",
    "KUCKMAL_CHUNK_SIZE",
    "KUCKMAL_KEEP_INTERMEDIATE",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_config_defaults_without_env() {
    clear_env();

    let config = IngestConfig::from_env().unwrap();
    assert_eq!(config.batch_size, 5000);
    assert_eq!(config.chunk_size, 8192);
    assert_eq!(config.database_path, PathBuf::from("./data/kuckmal.db"));
    assert!(!config.keep_intermediate);
}

#[test]
#[serial]
fn test_config_from_env() {
    clear_env();
    env::set_var("KUCKMAL_DATABASE_PATH", "/var/lib/kuckmal/media.db");
    env::set_var("KUCKMAL_WORK_DIR", "/var/tmp/kuckmal");
    env::set_var("KUCKMAL_BATCH_SIZE", "250");
    env::set_var("KUCKMAL_CHUNK_SIZE", "65536");
    env::set_var("KUCKMAL_KEEP_INTERMEDIATE", "true");

    let config = IngestConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.database_path, PathBuf::from("/var/lib/kuckmal/media.db"));
    assert_eq!(config.work_dir, PathBuf::from("/var/tmp/kuckmal"));
    assert_eq!(config.batch_size, 250);
    assert_eq!(config.chunk_size, 65536);
    assert!(config.keep_intermediate);
}

#[test]
#[serial]
fn test_config_ignores_unparseable_values() {
    clear_env();
    env::set_var("KUCKMAL_BATCH_SIZE", "many");

    let config = IngestConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.batch_size, 5000);
}

#[test]
#[serial]
fn test_config_rejects_zero_batch_size() {
    clear_env();
    env::set_var("KUCKMAL_BATCH_SIZE", "0");

    let result = IngestConfig::from_env();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("KUCKMAL_BATCH_SIZE"));
}
