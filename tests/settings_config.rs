use std::sync::Mutex;

use tempfile::NamedTempFile;

use camdash::config::Settings;
use camdash::Lang;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CAMDASH_CONFIG",
        "CAMDASH_DB_PATH",
        "CAMDASH_PROBE_THREADS",
        "CAMDASH_MAX_PREVIEWS",
        "CAMDASH_PORT",
        "CAMDASH_LANG",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_settings_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "site_a.db",
        "probe_threads": 12,
        "max_previews": 9,
        "port": 8554,
        "try_defaults": true,
        "lang": "en"
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("CAMDASH_CONFIG", file.path());
    std::env::set_var("CAMDASH_PROBE_THREADS", "4");
    std::env::set_var("CAMDASH_LANG", "ar");

    let cfg = Settings::load().expect("load settings");
    assert_eq!(cfg.db_path, "site_a.db");
    assert_eq!(cfg.probe_threads, 4);
    assert_eq!(cfg.max_previews, 9);
    assert_eq!(cfg.port, 8554);
    assert!(cfg.smart_probe);
    assert!(cfg.try_defaults);
    assert_eq!(cfg.lang, Lang::Ar);
    assert_eq!(cfg.source_path, file.path());

    clear_env();
}

#[test]
fn env_values_are_clamped() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config");
    std::fs::write(file.path(), "{}").expect("write config");
    std::env::set_var("CAMDASH_CONFIG", file.path());
    std::env::set_var("CAMDASH_PROBE_THREADS", "500");
    std::env::set_var("CAMDASH_MAX_PREVIEWS", "0");

    let cfg = Settings::load().expect("load settings");
    assert_eq!(cfg.probe_threads, 32);
    assert_eq!(cfg.max_previews, 1);

    std::env::set_var("CAMDASH_PORT", "not-a-port");
    assert!(Settings::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    std::env::set_var("CAMDASH_CONFIG", dir.path().join("absent.json"));
    assert!(Settings::load().is_err());

    clear_env();
}

#[test]
fn toml_settings_round_trip() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("camdash.toml");
    let mut cfg = Settings {
        probe_threads: 16,
        max_previews: 3,
        port: 7447,
        lang: Lang::En,
        source_path: path.clone(),
        ..Settings::default()
    };
    cfg.save().expect("save settings");

    let raw = std::fs::read_to_string(&path).expect("read back");
    assert!(raw.contains("probe_threads = 16"));

    let loaded = Settings::load_from(&path).expect("load saved settings");
    assert_eq!(loaded, cfg);
}
