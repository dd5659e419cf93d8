//! Fetch-strategy resolution
//!
//! Some feeds reject requests from datacenter addresses. Those are fetched
//! through an HTTP proxy endpoint that takes the target URL as an encoded
//! suffix.

use crate::config::ProxyConfig;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

/// How a feed URL should be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDecision {
    pub original_url: String,
    pub final_url: String,
    pub is_proxied: bool,
}

impl ProxyDecision {
    pub fn direct(url: &str) -> Self {
        Self {
            original_url: url.to_string(),
            final_url: url.to_string(),
            is_proxied: false,
        }
    }

    pub fn proxied(original_url: &str, final_url: String) -> Self {
        Self {
            original_url: original_url.to_string(),
            final_url,
            is_proxied: true,
        }
    }
}

/// Failure to build a proxied URL; always recovered by fetching directly
#[derive(Debug, Error)]
#[error("Proxied URL '{proxied}' is not a valid absolute URL: {reason}")]
pub struct ProxyEncodingError {
    pub proxied: String,
    pub reason: String,
}

/// Decides whether a feed URL is fetched directly or through the proxy
#[cfg_attr(test, mockall::automock)]
pub trait ResolveProxy: Send + Sync {
    /// Never fails; any problem degrades to a direct decision
    fn resolve(&self, original_url: &str) -> ProxyDecision;
}

/// Resolver driven by a fixed list of URL fragments
#[derive(Debug, Clone)]
pub struct ProxyResolver {
    enabled: bool,
    base_url: Option<String>,
    domains: Vec<String>,
}

impl ProxyResolver {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            enabled: config.enabled,
            base_url: config
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            domains: config.domains.clone(),
        }
    }

    /// A resolver that always fetches directly
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_url: None,
            domains: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.base_url.is_some()
    }

    fn requires_proxy(&self, url: &str) -> bool {
        self.domains.iter().any(|fragment| url.contains(fragment.as_str()))
    }
}

impl ResolveProxy for ProxyResolver {
    fn resolve(&self, original_url: &str) -> ProxyDecision {
        let base_url = match (&self.base_url, self.enabled) {
            (Some(base_url), true) => base_url,
            _ => return ProxyDecision::direct(original_url),
        };

        if !self.requires_proxy(original_url) {
            debug!("Fetching {} directly", original_url);
            return ProxyDecision::direct(original_url);
        }

        match encode_for_proxy(base_url, original_url) {
            Ok(final_url) => {
                info!("Routing {} through proxy", original_url);
                ProxyDecision::proxied(original_url, final_url)
            }
            Err(e) => {
                warn!("{}; fetching {} directly", e, original_url);
                ProxyDecision::direct(original_url)
            }
        }
    }
}

/// Appends the form-encoded target URL to the proxy base
pub fn encode_for_proxy(base_url: &str, original_url: &str) -> Result<String, ProxyEncodingError> {
    let encoded: String = form_urlencoded::byte_serialize(original_url.as_bytes()).collect();
    let proxied = format!("{}{}", base_url, encoded);

    Url::parse(&proxied).map_err(|e| ProxyEncodingError {
        proxied: proxied.clone(),
        reason: e.to_string(),
    })?;

    Ok(proxied)
}
