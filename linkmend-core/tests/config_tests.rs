// Tests for configuration loading

use linkmend_core::Error;
use linkmend_core::config::{
    Config, DEFAULT_CONFIG, ENV_BRANCH, ENV_REPO, ENV_SITE, load_config, write_default_config,
};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&dir.path().join("nope.toml")).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.site.sitemap_path, "/sitemap.xml");
    assert_eq!(config.site.probe_timeout_secs, 8);
    assert_eq!(config.scan.concurrency, 1);
    assert_eq!(config.scan.suggestion_limit, 5);
    assert_eq!(config.repository.extensions, vec!["md", "mdx"]);
    assert_eq!(config.remediation.min_confidence, 0);
}

#[test]
fn test_default_template_parses_to_defaults() {
    let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_partial_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[site]
base_url = "https://docs.example.com"

[scan]
concurrency = 4

[remediation]
min_confidence = 60
base_branch = "develop"
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();

    assert_eq!(config.site.base_url.as_deref(), Some("https://docs.example.com"));
    assert_eq!(config.site.sitemap_path, "/sitemap.xml");
    assert_eq!(config.scan.concurrency, 4);
    assert_eq!(config.remediation.min_confidence, 60);
    assert_eq!(config.remediation.base_branch.as_deref(), Some("develop"));
    assert_eq!(config.remediation_options().min_confidence, 60);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[site\nbase_url = ").unwrap();

    let err = load_config(&path).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_overrides_replace_file_values() {
    let mut config = Config::default();
    config.site.base_url = Some("https://old.example.com".to_string());

    let env: HashMap<&str, &str> = HashMap::from([
        (ENV_SITE, "https://docs.example.com"),
        (ENV_REPO, "https://github.com/acme/docs"),
        (ENV_BRANCH, "  "),
    ]);
    config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.site.base_url.as_deref(), Some("https://docs.example.com"));
    assert_eq!(
        config.repository.url.as_deref(),
        Some("https://github.com/acme/docs")
    );
    // Blank values are ignored.
    assert_eq!(config.repository.branch, None);
}

#[test]
fn test_scan_settings_require_site() {
    let config = Config::default();
    let err = config.scan_settings().unwrap_err();
    assert!(err.to_string().contains(ENV_SITE));
}

#[test]
fn test_scan_settings_from_config() {
    let mut config = Config::default();
    config.site.base_url = Some("https://docs.example.com/".to_string());
    config.site.probe_timeout_secs = 3;
    config.scan.suggestion_threshold = 0.3;

    let settings = config.scan_settings().unwrap();

    assert_eq!(settings.base_url, "https://docs.example.com");
    assert_eq!(settings.probe_timeout, Duration::from_secs(3));
    assert_eq!(settings.threshold, 0.3);
    assert_eq!(settings.limit, 5);
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = Config::default();
    config.scan.concurrency = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.scan.suggestion_threshold = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.remediation.min_confidence = 101;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.site.base_url = Some("not a url".to_string());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.site.probe_timeout_secs = 0;
    assert!(config.validate().is_err());

    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_write_default_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    write_default_config(&path, false).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

    let err = write_default_config(&path, false).unwrap_err();
    assert!(err.to_string().contains("--force"));

    std::fs::write(&path, "# edited").unwrap();
    write_default_config(&path, true).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
}
