use hookline_core::HookError;
use hookline_media::{MediaConfig, PipelineConfig};
use serde::Deserialize;
use smart_default::SmartDefault;
use crate::error::FeatureResult;

/// Configurazione della feature sticker
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default)]
pub struct StickerConfig {
    #[default(true)]
    pub enabled: bool,
    /// Sticker links are `<url_base><id><extension>?size=<preview_size>`
    #[default("https://media.discordapp.net/stickers/".to_string())]
    pub url_base: String,
    #[default(160)]
    pub preview_size: u32,
}

/// Configurazione della feature di animazione
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default)]
pub struct AnimateConfig {
    #[default(true)]
    pub enabled: bool,
    #[default("inline_media_image_preview".to_string())]
    pub inline_view_resource: String,
    #[default("media_image".to_string())]
    pub media_view_resource: String,
    #[default("id".to_string())]
    pub resource_kind: String,
}

/// Whole configuration; every section is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct FeaturesConfig {
    pub media: MediaConfig,
    pub pipeline: PipelineConfig,
    pub stickers: StickerConfig,
    pub animate: AnimateConfig,
}

impl FeaturesConfig {
    pub fn from_json_str(json: &str) -> FeatureResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HookError::from(e).into())
    }

    pub fn from_json_value(value: serde_json::Value) -> FeatureResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| HookError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = FeaturesConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FeaturesConfig::default());
        assert!(config.stickers.enabled);
        assert_eq!(config.animate.inline_view_resource, "inline_media_image_preview");
    }

    #[test]
    fn sections_override_independently() {
        let config = FeaturesConfig::from_json_value(serde_json::json!({
            "stickers": { "enabled": false },
            "pipeline": { "max_concurrent_loads": 8 }
        })).unwrap();
        assert!(!config.stickers.enabled);
        assert_eq!(config.stickers.preview_size, 160);
        assert_eq!(config.pipeline.max_concurrent_loads, 8);
        assert!(config.animate.enabled);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = FeaturesConfig::from_json_str("{ nope").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
