use crate::UrlError;
use url::Url;

/// Query parameters that only carry campaign or referral tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Produces the deduplication key for a post URL
///
/// Equivalent URLs (scheme case, `http` vs `https`, default port, `www.`
/// prefix, trailing slash, fragment, tracking parameters, query order) map to
/// the same key, and the key is a fixed point: normalizing it again returns it
/// unchanged.
///
/// URLs that cannot be parsed fall back to a simpler key: trimmed, lowercased,
/// with query, fragment and trailing slashes removed.
///
/// # Examples
///
/// ```
/// use blogroll::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("http://WWW.Example.com:80/posts/1/?utm_source=rss#top"),
///     "https://example.com/posts/1"
/// );
/// ```
pub fn normalize_url(url_str: &str) -> String {
    match canonicalize_url(url_str) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::debug!("Falling back to simple URL key for '{}': {}", url_str, e);
            fallback_key(url_str)
        }
    }
}

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Parse the URL; only HTTP and HTTPS are accepted
/// 2. Upgrade `http` to `https` (the default port is dropped with it)
/// 3. Lowercase the host and remove leading `www.` labels
/// 4. Normalize the path: dot segments resolved, repeated slashes collapsed,
///    trailing slash removed (root stays `/`), case preserved
/// 5. Remove the fragment
/// 6. Remove tracking parameters, sort the rest by key, drop an empty query
///
/// Non-tracking query parameters and path case are kept in the key, so
/// `?page=2` and `/Post` stay distinct from `/post`. Only unparseable URLs get
/// the lowercased, query-less fallback key of `normalize_url`.
pub fn canonicalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => url
            .set_scheme("https")
            .map_err(|_| UrlError::InvalidScheme(url_str.to_string()))?,
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let host = strip_www(&host.to_lowercase()).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = retained_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        // Never reduce a host to a bare top-level label
        if !rest.contains('.') {
            break;
        }
        host = rest;
    }
    host
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn retained_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

fn fallback_key(url_str: &str) -> String {
    let trimmed = url_str.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    without_query.trim_end_matches('/').trim().to_lowercase()
}
