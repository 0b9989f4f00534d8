//! Deep link parsing and web-view URL construction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use webshell_navigation::{scheme_prefix, TOKEN_QUERY_PARAM};

use crate::error::DeepLinkError;
use crate::Result;

/// Query parameter marking loads that came from a deep link.
pub const SOURCE_PARAM: &str = "source";
pub const SOURCE_DEEPLINK: &str = "deeplink";
/// Query parameter carrying the path of a custom-scheme link.
pub const DEEPLINK_PATH_PARAM: &str = "deeplink_path";

/// A deep link broken into the parts the page and the shell care about.
///
/// Serialized as-is into `last_deeplink_data` and into the
/// `DEEP_LINK_RECEIVED` message, so field names stay camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLink {
    pub full_url: String,
    /// Scheme with trailing `:`, e.g. `app:`
    pub protocol: String,
    /// Host with port when present
    pub host: String,
    pub pathname: String,
    /// `?...` or empty
    pub search: String,
    /// `#...` or empty
    pub hash: String,
    pub params: BTreeMap<String, String>,
    pub is_custom_scheme: bool,
    pub is_http_scheme: bool,
    /// `host + pathname` for custom-scheme links, which use the host as the
    /// first path segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
}

impl ParsedLink {
    pub fn parse(raw: &str) -> Result<Self> {
        if !is_valid_url(raw) {
            return Err(DeepLinkError::InvalidUrl(raw.to_string()));
        }

        let Ok(url) = Url::parse(raw) else {
            // Custom scheme the URL parser rejects
            let scheme = scheme_prefix(raw).unwrap_or_default().to_lowercase();
            return Ok(Self {
                full_url: raw.to_string(),
                protocol: format!("{}:", scheme),
                host: String::new(),
                pathname: raw[scheme.len() + 1..].to_string(),
                search: String::new(),
                hash: String::new(),
                params: BTreeMap::new(),
                is_custom_scheme: true,
                is_http_scheme: false,
                custom_path: None,
            });
        };

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let is_http_scheme = matches!(url.scheme(), "http" | "https");
        let custom_path = if !is_http_scheme && !host.is_empty() {
            Some(format!("{}{}", host, url.path()))
        } else {
            None
        };

        Ok(Self {
            full_url: raw.to_string(),
            protocol: format!("{}:", url.scheme()),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
            params: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            is_custom_scheme: !is_http_scheme,
            is_http_scheme,
            custom_path,
            host,
        })
    }
}

/// A link is usable if it parses as a URL or at least starts with a
/// syntactically valid `scheme:`.
pub fn is_valid_url(raw: &str) -> bool {
    if raw.trim().is_empty() {
        return false;
    }
    Url::parse(raw).is_ok() || scheme_prefix(raw).is_some()
}

/// Build the URL the primary surface loads for a deep link: the base URL
/// plus the push token, the link's query parameters, the custom-scheme path
/// and `source=deeplink`. Existing parameters of the same name are replaced.
pub fn build_webview_url(base_url: &str, link: Option<&ParsedLink>, token: Option<&str>) -> String {
    let mut url = match Url::parse(base_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(base_url = %base_url, error = %e, "Base URL does not parse, using it verbatim");
            return match token {
                Some(token) => format!("{}?{}={}", base_url, TOKEN_QUERY_PARAM, token),
                None => base_url.to_string(),
            };
        }
    };

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        set_query_param(&mut url, TOKEN_QUERY_PARAM, token);
    }

    if let Some(link) = link {
        for (key, value) in &link.params {
            set_query_param(&mut url, key, value);
        }
        if let Some(path) = &link.custom_path {
            set_query_param(&mut url, DEEPLINK_PATH_PARAM, path);
        }
    }

    set_query_param(&mut url, SOURCE_PARAM, SOURCE_DEEPLINK);
    url.to_string()
}

fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((key.to_string(), value.to_string()));

    url.query_pairs_mut().clear().extend_pairs(pairs);
}
