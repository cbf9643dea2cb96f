//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use regex::Regex;
use url::Url;

use crate::cache::MemoryCache;
use crate::client::{ClientBuilder, standard_chain};
use crate::interceptors::CacheConfig;
use crate::metrics::MetricsConfig;
use crate::policy::{Backoff, ExponentialBackoff, PolicySettings};
use crate::resilience::{
    BreakerSettings, CircuitBreaker, ConsecutiveFailureBreaker, RateLimiter, TokenBucket,
};

use super::cli::Cli;
use super::defaults;
use super::endpoints::{EndpointRule, EndpointRules};
use super::error::{ConfigError, kind};
use super::toml::{
    BackoffSection, BreakerSection, CacheSection, EndpointSection, RateLimiterSection, TomlConfig,
};

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Base URL that request paths are appended to
    pub base_url: Option<Url>,

    /// Client-wide default policy settings
    pub defaults: PolicySettings,

    /// Endpoint override rules
    pub endpoints: EndpointRules,

    /// Response cache configuration (memory backend)
    pub cache: CacheConfig,

    /// Metrics naming
    pub metrics: MetricsConfig,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base_url = self
            .base_url
            .as_ref()
            .map_or_else(|| "none".to_string(), ToString::to_string);

        write!(
            f,
            "Config {{ base_url: {}, timeout: {}s, retries: {}, backoff: {:?}, endpoints: {}, \
             metrics: {} }}",
            base_url,
            self.defaults.timeout.unwrap_or_else(defaults::timeout).as_secs(),
            self.defaults.max_retries.unwrap_or(defaults::MAX_RETRIES),
            self.defaults.backoff,
            self.endpoints.len(),
            self.metrics.qualified("requests_total"),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base URL is invalid
    /// - A duration is zero
    /// - A header, method, status or regex is invalid
    /// - The backoff, a limiter or a breaker is misconfigured
    /// - An endpoint names an undefined limiter or breaker
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let base_url = Self::resolve_base_url(cli, toml)?;
        let defaults = Self::build_defaults(cli, toml)?;

        let limiters = build_limiters(toml.map_or(&[][..], |t| t.rate_limiters.as_slice()))?;
        let breakers = build_breakers(toml.map_or(&[][..], |t| t.breakers.as_slice()))?;

        let mut endpoints = EndpointRules::new();
        for section in toml.map_or(&[][..], |t| t.endpoints.as_slice()) {
            endpoints = endpoints.with(build_endpoint(section, &limiters, &breakers)?);
        }

        let cache = build_cache(toml.map(|t| &t.cache))?;
        let metrics = toml.map_or_else(MetricsConfig::default, |t| {
            MetricsConfig::new(
                t.metrics
                    .namespace
                    .as_deref()
                    .unwrap_or(defaults::METRICS_NAMESPACE),
                t.metrics.subsystem.as_deref().unwrap_or_default(),
            )
        });

        Ok(Self {
            base_url,
            defaults,
            endpoints,
            cache,
            metrics,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Returns a client builder carrying this configuration and the
    /// standard interceptor stack.
    #[must_use]
    pub fn client_builder(&self) -> ClientBuilder {
        let endpoints = self.endpoints.clone().into_endpoint_fn();
        let mut builder = ClientBuilder::new()
            .default_policy(self.defaults.clone())
            .endpoint_policy(move |method, path| endpoints(method, path))
            .interceptors(standard_chain(self.cache.clone(), self.metrics.clone()));
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.as_str());
        }
        builder
    }

    fn resolve_base_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Option<Url>, ConfigError> {
        // CLI takes precedence
        let Some(url_str) = cli
            .base_url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.client.base_url.as_deref()))
        else {
            return Ok(None);
        };

        Url::parse(url_str)
            .map(Some)
            .map_err(|e| ConfigError::InvalidUrl {
                url: url_str.to_string(),
                reason: e.to_string(),
            })
    }

    fn build_defaults(cli: &Cli, toml: Option<&TomlConfig>) -> Result<PolicySettings, ConfigError> {
        let client = toml.map(|t| &t.client);

        // Priority: CLI explicit > TOML > default
        let timeout_secs = cli
            .timeout
            .or_else(|| client.and_then(|c| c.timeout_secs))
            .unwrap_or(defaults::TIMEOUT_SECS);
        let max_retries = cli
            .retries
            .or_else(|| client.and_then(|c| c.max_retries))
            .unwrap_or(defaults::MAX_RETRIES);

        let mut settings = PolicySettings::new()
            .with_timeout(positive_secs("client.timeout_secs", timeout_secs)?)
            .with_max_retries(max_retries)
            .with_backoff(build_backoff(toml.map(|t| &t.backoff))?);

        if let Some(require_auth) = client.and_then(|c| c.require_auth) {
            settings = settings.with_require_auth(require_auth);
        }
        if let Some(max) = client.and_then(|c| c.max_response_size) {
            settings = settings.with_max_response_size(max);
        }
        if toml.is_some_and(|t| t.cache.enabled) {
            settings = settings.with_cache_enabled(true);
        }

        // TOML headers first, CLI headers override
        if let Some(client) = client {
            settings.headers = parse_header_table(&client.headers)?;
        }
        for header_str in &cli.headers {
            let (name, value) = parse_header_string(header_str)?;
            settings
                .headers
                .insert(parse_header_name(&name)?, parse_header_value(&name, &value)?);
        }

        Ok(settings)
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn build_backoff(section: Option<&BackoffSection>) -> Result<Backoff, ConfigError> {
    let strategy = section
        .and_then(|s| s.strategy.as_deref())
        .unwrap_or(defaults::BACKOFF_STRATEGY);
    let initial_ms = section
        .and_then(|s| s.initial_delay_ms)
        .unwrap_or(defaults::BACKOFF_INITIAL_DELAY_MS);
    let max_ms = section
        .and_then(|s| s.max_delay_ms)
        .unwrap_or(defaults::BACKOFF_MAX_DELAY_MS);
    let multiplier = section
        .and_then(|s| s.multiplier)
        .unwrap_or(defaults::BACKOFF_MULTIPLIER);

    let exponential = || -> Result<ExponentialBackoff, ConfigError> {
        if multiplier <= 0.0 || !multiplier.is_finite() {
            return Err(ConfigError::InvalidBackoff(
                "multiplier must be a positive finite number".to_string(),
            ));
        }
        if max_ms < initial_ms {
            return Err(ConfigError::InvalidBackoff(format!(
                "max_delay_ms ({max_ms}) must be >= initial_delay_ms ({initial_ms})"
            )));
        }
        Ok(ExponentialBackoff::new()
            .with_initial_delay(Duration::from_millis(initial_ms))
            .with_max_delay(Duration::from_millis(max_ms))
            .with_multiplier(multiplier))
    };

    match strategy.to_lowercase().as_str() {
        "constant" => Ok(Backoff::Constant(Duration::from_millis(initial_ms))),
        "exponential" => exponential().map(Backoff::Exponential),
        "jittered" | "jitter" => exponential().map(Backoff::Jittered),
        other => Err(ConfigError::InvalidBackoff(format!(
            "unknown strategy '{other}': expected constant, exponential or jittered"
        ))),
    }
}

fn build_cache(section: Option<&CacheSection>) -> Result<CacheConfig, ConfigError> {
    let mut cache = CacheConfig::new()
        .with_backend(Arc::new(MemoryCache::new()))
        .with_default_ttl(defaults::cache_ttl());
    let Some(section) = section else {
        return Ok(cache);
    };

    if let Some(secs) = section.default_ttl_secs {
        cache = cache.with_default_ttl(positive_secs("cache.default_ttl_secs", secs)?);
    }
    if let Some(methods) = &section.methods {
        let methods = methods
            .iter()
            .map(|method| parse_method(method))
            .collect::<Result<Vec<_>, _>>()?;
        cache = cache.with_methods(methods);
    }
    if let Some(codes) = &section.status_codes {
        let codes = codes
            .iter()
            .map(|code| StatusCode::from_u16(*code).map_err(|_| ConfigError::InvalidStatus(*code)))
            .collect::<Result<Vec<_>, _>>()?;
        cache = cache.with_status_codes(codes);
    }
    if let Some(name) = &section.skip_header {
        cache = cache.with_skip_header(parse_header_name(name)?);
    }
    Ok(cache)
}

fn build_limiters(
    sections: &[RateLimiterSection],
) -> Result<HashMap<String, Arc<dyn RateLimiter>>, ConfigError> {
    let mut limiters: HashMap<String, Arc<dyn RateLimiter>> = HashMap::new();
    for section in sections {
        let invalid = |reason: &str| ConfigError::InvalidResilience {
            kind: kind::RATE_LIMITER,
            name: section.name.clone(),
            reason: reason.to_string(),
        };
        if !section.requests_per_second.is_finite() || section.requests_per_second <= 0.0 {
            return Err(invalid("requests_per_second must be a positive number"));
        }
        if section.burst == 0 {
            return Err(invalid("burst must be greater than 0"));
        }
        if limiters.contains_key(&section.name) {
            return Err(invalid("defined more than once"));
        }
        limiters.insert(
            section.name.clone(),
            Arc::new(TokenBucket::new(section.requests_per_second, section.burst)),
        );
    }
    Ok(limiters)
}

fn build_breakers(
    sections: &[BreakerSection],
) -> Result<HashMap<String, Arc<dyn CircuitBreaker>>, ConfigError> {
    let mut breakers: HashMap<String, Arc<dyn CircuitBreaker>> = HashMap::new();
    for section in sections {
        let invalid = |reason: &str| ConfigError::InvalidResilience {
            kind: kind::BREAKER,
            name: section.name.clone(),
            reason: reason.to_string(),
        };
        let threshold = section
            .failure_threshold
            .unwrap_or(defaults::BREAKER_FAILURE_THRESHOLD);
        let open_secs = section
            .open_timeout_secs
            .unwrap_or(defaults::BREAKER_OPEN_TIMEOUT_SECS);
        let half_open = section
            .half_open_max_requests
            .unwrap_or(defaults::BREAKER_HALF_OPEN_MAX_REQUESTS);

        if threshold == 0 {
            return Err(invalid("failure_threshold must be greater than 0"));
        }
        if open_secs == 0 {
            return Err(invalid("open_timeout_secs must be greater than 0"));
        }
        if half_open == 0 {
            return Err(invalid("half_open_max_requests must be greater than 0"));
        }
        if breakers.contains_key(&section.name) {
            return Err(invalid("defined more than once"));
        }

        let settings = BreakerSettings::new()
            .with_failure_threshold(threshold)
            .with_open_timeout(Duration::from_secs(open_secs))
            .with_half_open_max_requests(half_open);
        breakers.insert(
            section.name.clone(),
            Arc::new(ConsecutiveFailureBreaker::new(section.name.clone(), settings)),
        );
    }
    Ok(breakers)
}

fn build_endpoint(
    section: &EndpointSection,
    limiters: &HashMap<String, Arc<dyn RateLimiter>>,
    breakers: &HashMap<String, Arc<dyn CircuitBreaker>>,
) -> Result<EndpointRule, ConfigError> {
    let method = section.method.as_deref().map(parse_method).transpose()?;
    let pattern = Regex::new(&section.path).map_err(|e| ConfigError::InvalidRegex {
        pattern: section.path.clone(),
        source: e,
    })?;

    let mut settings = PolicySettings::new();
    if let Some(secs) = section.timeout_secs {
        settings = settings.with_timeout(positive_secs("endpoints.timeout_secs", secs)?);
    }
    if let Some(retries) = section.max_retries {
        settings = settings.with_max_retries(retries);
    }
    if let Some(require_auth) = section.require_auth {
        settings = settings.with_require_auth(require_auth);
    }
    if let Some(enabled) = section.cache {
        settings = settings.with_cache_enabled(enabled);
    }
    if let Some(secs) = section.cache_ttl_secs {
        settings.cache_ttl = Some(positive_secs("endpoints.cache_ttl_secs", secs)?);
    }
    if let Some(max) = section.max_response_size {
        settings = settings.with_max_response_size(max);
    }
    if let Some(name) = &section.rate_limiter {
        let limiter = limiters
            .get(name)
            .ok_or_else(|| unknown_reference(section, kind::RATE_LIMITER, name))?;
        settings = settings.with_rate_limiter(Arc::clone(limiter));
    }
    if let Some(name) = &section.breaker {
        let breaker = breakers
            .get(name)
            .ok_or_else(|| unknown_reference(section, kind::BREAKER, name))?;
        settings = settings.with_breaker(Arc::clone(breaker));
    }
    settings.headers = parse_header_table(&section.headers)?;
    for (key, value) in &section.tags {
        settings = settings.with_tag(key, value);
    }

    Ok(EndpointRule::new(method, pattern, settings))
}

fn unknown_reference(section: &EndpointSection, kind: &'static str, name: &str) -> ConfigError {
    ConfigError::UnknownReference {
        pattern: section.path.clone(),
        kind,
        name: name.to_string(),
    }
}

fn positive_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidDuration {
            field,
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_method(s: &str) -> Result<Method, ConfigError> {
    s.to_uppercase()
        .parse::<Method>()
        .map_err(|_| ConfigError::InvalidMethod(s.to_string()))
}

fn parse_header_table(table: &HashMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in table {
        headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
    }
    Ok(headers)
}

fn parse_header_string(s: &str) -> Result<(String, String), ConfigError> {
    // Try "Key=Value" format first
    if let Some((name, value)) = s.split_once('=') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    // Try "Key: Value" format
    if let Some((name, value)) = s.split_once(':') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    Err(ConfigError::InvalidHeader {
        value: s.to_string(),
    })
}

fn parse_header_name(name: &str) -> Result<HeaderName, ConfigError> {
    name.parse::<HeaderName>()
        .map_err(|e| ConfigError::InvalidHeaderName {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeaderValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
