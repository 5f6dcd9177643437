use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use streetcar::config::{ConfigOverrides, StreetcarConfig};
use streetcar::StreetcarError;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "STREETCAR_CONFIG",
        "STREETCAR_UTC_OFFSET",
        "STREETCAR_CUT_GAP_MS",
        "STREETCAR_MIN_SPEED_KPH",
        "STREETCAR_INFER_COORDINATES",
        "STREETCAR_WORKERS",
        "STREETCAR_LINK_FILES",
        "STREETCAR_OUTPUT_DIR",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_then_env_then_cli() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        r#"
        utc_offset = "-04:00"
        output_dir = "out"

        [sequence]
        cut_gap_ms = 8000
        min_speed_kph = 2.5

        [extract]
        workers = 2

        [output]
        link_files = false
        "#,
    );

    std::env::set_var("STREETCAR_CONFIG", file.path());
    std::env::set_var("STREETCAR_CUT_GAP_MS", "7000");
    std::env::set_var("STREETCAR_INFER_COORDINATES", "true");

    let cli = ConfigOverrides {
        workers: Some(5),
        ..ConfigOverrides::default()
    };
    let cfg = StreetcarConfig::load(None, cli).expect("load config");

    assert_eq!(cfg.utc_offset.minutes(), -240);
    assert_eq!(cfg.output_dir, PathBuf::from("out"));
    assert_eq!(cfg.cut_gap_ms(), 7000);
    assert_eq!(cfg.min_speed_kph, 2.5);
    assert!(cfg.infer_coordinates);
    assert_eq!(cfg.workers, 5);
    assert!(!cfg.link_files);

    clear_env();
}

#[test]
fn explicit_path_wins_over_env_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let env_file = config_file(r#"utc_offset = "+09:00""#);
    let arg_file = config_file(r#"utc_offset = "+05:30""#);
    std::env::set_var("STREETCAR_CONFIG", env_file.path());

    let cfg = StreetcarConfig::load(Some(arg_file.path()), ConfigOverrides::default())
        .expect("load config");
    assert_eq!(cfg.utc_offset.minutes(), 330);

    clear_env();
}

#[test]
fn env_alone_is_enough() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("STREETCAR_UTC_OFFSET", "Z");
    std::env::set_var("STREETCAR_OUTPUT_DIR", "/tmp/streetcar-out");
    let cfg = StreetcarConfig::load(None, ConfigOverrides::default()).expect("load config");
    assert_eq!(cfg.utc_offset.minutes(), 0);
    assert_eq!(cfg.cut_gap_ms(), 5000);
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/streetcar-out"));

    clear_env();
}

#[test]
fn missing_offset_is_a_configuration_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let err = StreetcarConfig::load(None, ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, StreetcarError::Configuration(_)));

    clear_env();
}

#[test]
fn malformed_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("STREETCAR_UTC_OFFSET", "Z");
    std::env::set_var("STREETCAR_WORKERS", "many");
    let err = StreetcarConfig::load(None, ConfigOverrides::default()).unwrap_err();
    assert!(err.to_string().contains("STREETCAR_WORKERS"));

    clear_env();
}

#[test]
fn unknown_file_keys_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        r#"
        utc_offset = "Z"
        [sequence]
        cut_gap = 5000
        "#,
    );
    assert!(StreetcarConfig::load(Some(file.path()), ConfigOverrides::default()).is_err());

    clear_env();
}
