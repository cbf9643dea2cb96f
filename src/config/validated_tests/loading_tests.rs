//! Tests for configuration loading, files and display.

use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

use super::super::validated::write_default_config;
use super::*;

mod files {
    use super::*;

    #[test]
    fn load_reads_the_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nbase_url = \"https://api.example.com\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = ValidatedConfig::load(&cli(&["--config", &path])).unwrap();

        assert_eq!(
            config.base_url.as_ref().map(url::Url::as_str),
            Some("https://api.example.com/")
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()]));

        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[client\nbase_url = ").unwrap();

        let result = ValidatedConfig::load(&cli(&["--config", file.path().to_str().unwrap()]));

        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn written_template_loads_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resilient-http.toml");

        write_default_config(&path).unwrap();
        let config = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()])).unwrap();

        assert_eq!(config.defaults.max_retries, Some(2));
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("config.toml");

        assert!(matches!(
            write_default_config(&path),
            Err(ConfigError::FileWrite { .. })
        ));
    }
}

mod without_file {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = ValidatedConfig::from_raw(&cli(&[]), None).unwrap();

        assert!(config.base_url.is_none());
        assert_eq!(config.defaults.timeout, Some(std::time::Duration::from_secs(10)));
        assert_eq!(config.defaults.max_retries, Some(2));
        assert_eq!(config.defaults.cache_enabled, None);
        assert!(config.cache.has_backend());
        assert_eq!(config.metrics.namespace, "http_client");
        assert!(!config.verbose);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--base-url", "not a url"]), None);
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--timeout", "0"]), None);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDuration {
                field: "client.timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn display_summarizes() {
        let config =
            ValidatedConfig::from_raw(&cli(&["--base-url", "https://api.example.com"]), None)
                .unwrap();

        let shown = config.to_string();
        assert!(shown.contains("base_url: https://api.example.com/"));
        assert!(shown.contains("timeout: 10s"));
        assert!(shown.contains("retries: 2"));
        assert!(shown.contains("http_client_requests_total"));
    }

    #[test]
    fn builds_a_client() {
        let config =
            ValidatedConfig::from_raw(&cli(&["--base-url", "https://api.example.com/"]), None)
                .unwrap();

        let client = config.client_builder().build().unwrap();

        assert_eq!(client.base_url(), Some("https://api.example.com"));
        let policy = client.resolver().resolve(&Method::GET, "/anything");
        assert_eq!(policy.max_retries, 2);
    }
}
