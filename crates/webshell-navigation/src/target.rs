//! Parsed navigation candidates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::error::NavigationError;
use crate::Result;

/// One navigation attempt, broken into the parts the classifier matches on.
///
/// Built fresh for every request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub raw_url: String,
    /// Lowercased scheme without the trailing `:`
    pub scheme: String,
    /// Lowercased host, empty for opaque URIs
    pub host: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub fragment: Option<String>,
}

impl NavigationTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(NavigationError::InvalidUrl(raw.to_string()));
        }

        if let Ok(url) = Url::parse(raw) {
            let query = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            return Ok(Self {
                raw_url: raw.to_string(),
                scheme: url.scheme().to_lowercase(),
                host: url.host_str().unwrap_or_default().to_lowercase(),
                path: url.path().to_string(),
                query,
                fragment: url.fragment().map(str::to_string),
            });
        }

        // Custom schemes the URL parser rejects still carry a usable scheme
        let scheme = scheme_prefix(raw).ok_or_else(|| NavigationError::InvalidUrl(raw.to_string()))?;
        let rest = &raw[scheme.len() + 1..];
        let (rest, fragment) = match rest.split_once('#') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            raw_url: raw.to_string(),
            scheme: scheme.to_lowercase(),
            host: String::new(),
            path: rest.to_string(),
            query: BTreeMap::new(),
            fragment,
        })
    }

    pub fn is_http(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }

    /// Host equals `domain` or is one of its subdomains.
    pub fn host_matches(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.host == domain || self.host.ends_with(&format!(".{}", domain))
    }
}

/// Returns the `scheme` part of `scheme:...` when it is syntactically valid.
pub fn scheme_prefix(input: &str) -> Option<&str> {
    let (scheme, _) = input.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')) {
        Some(scheme)
    } else {
        None
    }
}

pub(crate) mod urlencoding {
    /// Decode `%XX` escapes; malformed escapes are kept verbatim.
    pub fn decode(input: &str) -> String {
        let bytes = input.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    out.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn hex_value(byte: u8) -> Option<u8> {
        (byte as char).to_digit(16).map(|d| d as u8)
    }
}
