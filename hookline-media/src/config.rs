use serde::Deserialize;
use smart_default::SmartDefault;

/// Hosts and extension the canonicalizer and the media hooks work with.
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default)]
pub struct MediaConfig {
    /// Proxy hosts are `images-ext-<n>.<proxy_domain>`
    #[default("discordapp.net".to_string())]
    pub proxy_domain: String,
    /// Hosts whose proxied URLs may be unwrapped
    #[default(vec!["cdn.discordapp.com".to_string(), "media.discordapp.net".to_string()])]
    pub first_party_hosts: Vec<String>,
    /// Serves the animated rendition
    #[default("cdn.discordapp.com".to_string())]
    pub cdn_host: String,
    /// Serves a static single-frame rendition of the same asset
    #[default("media.discordapp.net".to_string())]
    pub delivery_host: String,
    #[default(".png".to_string())]
    pub animated_extension: String,
}

impl MediaConfig {
    pub fn is_first_party(&self, host: &str) -> bool {
        self.first_party_hosts.iter().any(|it| it.eq_ignore_ascii_case(host))
    }
}

/// Sizing of the background work.
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default)]
pub struct PipelineConfig {
    #[default(4)]
    pub max_concurrent_loads: usize,
}
