//! Tests for CLI over TOML over default precedence.

use std::time::Duration;

use super::*;

mod scalars {
    use super::*;

    #[test]
    fn cli_wins_over_toml() {
        let toml = toml(
            r#"
            [client]
            base_url = "https://from-toml.example.com"
            timeout_secs = 30
            max_retries = 5
        "#,
        );
        let cli = cli(&[
            "--base-url",
            "https://from-cli.example.com",
            "--timeout",
            "3",
            "--retries",
            "0",
        ]);

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.base_url.unwrap().host_str(), Some("from-cli.example.com"));
        assert_eq!(config.defaults.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.defaults.max_retries, Some(0));
    }

    #[test]
    fn toml_wins_over_defaults() {
        let toml = toml(
            r#"
            [client]
            timeout_secs = 30
            max_retries = 5
            require_auth = true
            max_response_size = 2048
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.defaults.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.defaults.max_retries, Some(5));
        assert_eq!(config.defaults.require_auth, Some(true));
        assert_eq!(config.defaults.max_response_size, Some(2048));
    }
}

mod headers {
    use super::*;

    #[test]
    fn cli_headers_replace_toml_headers_by_name() {
        let toml = toml(
            r#"
            [client.headers]
            X-Team = "checkout"
            User-Agent = "from-toml"
        "#,
        );
        let cli = cli(&["--header", "User-Agent=from-cli", "--header", "X-Trace: on"]);

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();
        let headers = &config.defaults.headers;

        assert_eq!(headers["user-agent"], "from-cli");
        assert_eq!(headers["x-team"], "checkout");
        assert_eq!(headers["x-trace"], "on");
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn malformed_cli_header_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--header", "no-separator"]), None);
        assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--header", "bad name=v"]), None);
        assert!(matches!(result, Err(ConfigError::InvalidHeaderName { .. })));
    }
}

mod cache {
    use super::*;

    #[test]
    fn enabled_cache_turns_on_default_caching() {
        let toml = toml("[cache]\nenabled = true\ndefault_ttl_secs = 90");

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.defaults.cache_enabled, Some(true));
        assert!(config.cache.has_backend());
    }

    #[test]
    fn invalid_cache_entries_are_rejected() {
        let bad_status = toml("[cache]\nstatus_codes = [42]");
        assert!(matches!(
            ValidatedConfig::from_raw(&cli(&[]), Some(&bad_status)),
            Err(ConfigError::InvalidStatus(42))
        ));

        let bad_method = toml("[cache]\nmethods = [\"G E T\"]");
        assert!(matches!(
            ValidatedConfig::from_raw(&cli(&[]), Some(&bad_method)),
            Err(ConfigError::InvalidMethod(_))
        ));

        let zero_ttl = toml("[cache]\ndefault_ttl_secs = 0");
        assert!(matches!(
            ValidatedConfig::from_raw(&cli(&[]), Some(&zero_ttl)),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn metrics_naming_comes_from_toml() {
        let toml = toml("[metrics]\nnamespace = \"shop\"\nsubsystem = \"orders\"");

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.metrics.qualified("requests_total"), "shop_orders_requests_total");
    }
}
