use clap::Parser;
use dupsweep::cli::Cli;
use dupsweep::config::Config;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
threads = 6
cache_path = "/var/cache/dupsweep.db"
progress = false
trash_dir = "/srv/holding"
"#,
    )
    .unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.threads, 6);
    assert_eq!(config.cache_path, Some(PathBuf::from("/var/cache/dupsweep.db")));
    assert!(config.use_cache);
    assert!(!config.progress);
    assert_eq!(config.trash_dir, Some(PathBuf::from("/srv/holding")));
}

#[test]
fn test_config_from_env() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("DUPSWEEP_THREADS", "12");
        jail.set_env("DUPSWEEP_USE_CACHE", "false");

        let config: Config = Config::figment(None).extract()?;
        assert_eq!(config.threads, 12);
        assert!(!config.use_cache);
        assert!(config.resolved_cache_path().is_none());
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "threads = 2")?;
        jail.set_env("DUPSWEEP_THREADS", "9");

        let config: Config = Config::figment(Some(Path::new("config.toml"))).extract()?;
        assert_eq!(config.threads, 9);
        Ok(())
    });
}

#[test]
fn test_missing_config_file_uses_defaults() {
    figment::Jail::expect_with(|_jail| {
        let config = Config::load(Some(Path::new("absent.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn test_invalid_value_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threads = \"many\"").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    assert!(figment.extract::<Config>().is_err());
}

#[test]
fn test_cli_flags_win_over_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "threads = 2\nprogress = true").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let mut config: Config = figment.extract().unwrap();
    let cli = Cli::try_parse_from(["dupsweep", "-j", "7", "--no-progress", "/data"]).unwrap();
    config.apply_cli(&cli);

    assert_eq!(config.threads, 7);
    assert!(!config.progress);
}
