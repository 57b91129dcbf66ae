use duplicut::config::{Config, ConfigError, ScanOverrides};
use duplicut::scanner::HashAlgorithm;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.concurrency, 50);
    assert_eq!(config.buffer_size, 32768);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
concurrency = 8
buffer_size = 65536
algorithm = "blake3"
roots = ["/srv/photos", "/mnt/backup"]
"#,
    )
    .unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.concurrency, 8);
    assert_eq!(config.buffer_size, 65536);
    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
    assert_eq!(
        config.roots,
        vec![PathBuf::from("/srv/photos"), PathBuf::from("/mnt/backup")]
    );
}

#[test]
fn test_config_load_from_env() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("DUPLICUT_CONCURRENCY", "16");
        jail.set_env("DUPLICUT_ALGORITHM", "blake3");

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("DUPLICUT_"))
            .extract()?;

        assert_eq!(config.concurrency, 16);
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.buffer_size, 32768);
        Ok(())
    });
}

#[test]
fn test_config_layering_order() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "duplicut.toml",
            "concurrency = 4\nbuffer_size = 100\nalgorithm = \"blake3\"\n",
        )?;
        jail.set_env("DUPLICUT_BUFFER_SIZE", "200");

        let overrides = ScanOverrides {
            algorithm: Some(HashAlgorithm::Sha256),
            ..ScanOverrides::default()
        };
        let config = Config::load(Some(&jail.directory().join("duplicut.toml")), &overrides)
            .map_err(|e| e.to_string())?;

        assert_eq!(config.concurrency, 4);
        assert_eq!(config.buffer_size, 200);
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        Ok(())
    });
}

#[test]
fn test_config_zero_concurrency_rejected() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "concurrency = 0\n")?;
        let result = Config::load(
            Some(&jail.directory().join("config.toml")),
            &ScanOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidConcurrency)));
        Ok(())
    });
}

#[test]
fn test_config_zero_buffer_from_cli_rejected() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "")?;
        let overrides = ScanOverrides {
            buffer_size: Some(0),
            ..ScanOverrides::default()
        };
        let result = Config::load(Some(&jail.directory().join("config.toml")), &overrides);
        assert!(matches!(result, Err(ConfigError::InvalidBufferSize)));
        Ok(())
    });
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "concurrency = \"many\"").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let result: Result<Config, _> = figment.extract();
    assert!(result.is_err());
}

#[test]
fn test_config_unknown_algorithm_rejected() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "algorithm = \"md5\"\n")?;
        let result = Config::load(
            Some(&jail.directory().join("config.toml")),
            &ScanOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
        Ok(())
    });
}

#[test]
fn test_config_missing_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let result = Config::load(
        Some(&temp_dir.path().join("absent.toml")),
        &ScanOverrides::default(),
    );
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_config_save_roundtrip() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        concurrency: 2,
        buffer_size: 4096,
        algorithm: HashAlgorithm::Blake3,
        roots: vec![PathBuf::from("/srv")],
    };
    config.save(&config_path).unwrap();

    let saved = fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("concurrency = 2"));
    assert!(saved.contains("algorithm = \"blake3\""));

    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}
