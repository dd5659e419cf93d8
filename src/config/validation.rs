use crate::config::types::{
    Config, CrawlerConfig, NotifyConfig, ProxyConfig, RetryConfig, ScheduleConfig, SourceEntry,
    StorageConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_proxy_config(&config.proxy)?;
    validate_storage_config(&config.storage)?;
    validate_notify_config(&config.notify)?;
    validate_schedule_config(&config.schedule)?;
    validate_sources(&config.sources)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.max_concurrent_sources < 1 || config.max_concurrent_sources > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-sources must be between 1 and 64, got {}",
            config.max_concurrent_sources
        )));
    }

    if config.max_posts_per_feed < 1 {
        return Err(ConfigError::Validation(
            "max-posts-per-feed must be >= 1".to_string(),
        ));
    }

    if config.run_deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "run-deadline must be > 0 seconds when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay ({}ms) must not be smaller than base-delay ({}ms)",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    // A missing base URL simply disables routing; a present one must be usable
    if let Some(base_url) = config.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        validate_http_url(base_url, "proxy base-url")?;
    }

    if config.domains.iter().any(|d| d.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "proxy domains cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if let Some(webhook_url) = &config.webhook_url {
        validate_http_url(webhook_url, "webhook-url")?;
    }

    if config.webhook_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "webhook-timeout must be >= 100ms, got {}ms",
            config.webhook_timeout_ms
        )));
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 60 {
        return Err(ConfigError::Validation(format!(
            "schedule interval must be >= 60 seconds, got {}",
            config.interval_secs
        )));
    }

    Ok(())
}

fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source with feed URL '{}' must have a name",
                source.feed_url
            )));
        }

        // Feed URLs are not checked here: a source with a broken feed URL is
        // reported per run instead of preventing every other source from loading
        if !seen.insert(source.feed_url.trim()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source feed URL '{}'",
                source.feed_url
            )));
        }

        if let Some(site_url) = &source.site_url {
            validate_http_url(site_url, "site-url")?;
        }
    }

    Ok(())
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
