use std::borrow::Cow;
use lazy_static::lazy_static;
use regex::Regex;
use crate::config::MediaConfig;

lazy_static! {
    // images-ext-<n>.<domain>/external/<key>[/<more>...]/https/<host><rest>
    // The lazy repetition stops at the first `https` path segment.
    static ref PROXY_URL: Regex = Regex::new(
        r"^https://images-ext-[0-9A-Za-z]+\.(?P<domain>[^/?#]+)/external/(?:[^/?#]+/)+?https/(?P<host>[^/?#]+)(?P<rest>[/?#].*)?$"
    ).unwrap();

    static ref DEFAULT_CANONICALIZER: UrlCanonicalizer = UrlCanonicalizer::default();
}

/// Rewrites media URLs into the form that still carries animation data.
#[derive(Debug, Clone, Default)]
pub struct UrlCanonicalizer {
    config: MediaConfig,
}

impl UrlCanonicalizer {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Unwraps first-party proxied URLs and moves the delivery host to the CDN host.
    /// Anything else is returned untouched. Idempotent.
    pub fn canonicalize<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        let unwrapped = match self.unwrap_proxy(raw) {
            Some(direct) => Cow::Owned(direct),
            None => Cow::Borrowed(raw),
        };
        match self.swap_delivery_host(&unwrapped) {
            Some(swapped) => Cow::Owned(swapped),
            None => unwrapped,
        }
    }

    fn unwrap_proxy(&self, raw: &str) -> Option<String> {
        let captures = PROXY_URL.captures(raw)?;
        if !captures["domain"].eq_ignore_ascii_case(&self.config.proxy_domain) {
            return None;
        }
        // Solo host first-party: i proxy verso host di terzi restano invariati
        if !self.config.is_first_party(&captures["host"]) {
            return None;
        }
        let rest = captures.name("rest").map(|it| it.as_str()).unwrap_or_default();
        Some(format!("https://{}{}", self.config.cdn_host, rest))
    }

    fn swap_delivery_host(&self, url: &str) -> Option<String> {
        let (scheme, remainder) = url.split_once("://")?;
        if !scheme.eq_ignore_ascii_case("https") && !scheme.eq_ignore_ascii_case("http") {
            return None;
        }
        let host_end = remainder.find(['/', '?', '#']).unwrap_or(remainder.len());
        let (host, rest) = remainder.split_at(host_end);
        if !host.eq_ignore_ascii_case(&self.config.delivery_host) {
            return None;
        }
        Some(format!("{}://{}{}", scheme, self.config.cdn_host, rest))
    }
}

/// [`UrlCanonicalizer::canonicalize`] with the default first-party hosts.
pub fn canonicalize(raw: &str) -> String {
    DEFAULT_CANONICALIZER.canonicalize(raw).into_owned()
}
