//! Host surface the features bind to: the intercepted methods, the host types
//! carried through their arguments, and the narrow capabilities each feature
//! needs from the host.

use std::sync::Weak;
use async_trait::async_trait;
use hookline_core::{HostValue, MethodId, MethodTable, ValueKind};
use hookline_media::ImageTarget;
use serde::Serialize;
use crate::error::FeatureResult;

pub type ChannelId = u64;
pub type ResourceId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sendability {
    Sendable,
    SendableWithPremium,
    SendableWithPremiumGuild,
    NonSendable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    pub id: u64,
    /// Includes the leading dot, e.g. `.png`
    pub format_extension: String,
}

/// Entry of the sticker picker. The host keeps its real sendability private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerItem {
    pub sticker: Sticker,
}

/// Media descriptor handed to the inline renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedMedia {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Body of a plain message send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRequest {
    pub content: String,
    pub nonce: String,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub users: Vec<u64>,
    pub roles: Vec<u64>,
    pub replied_user: bool,
}

impl MessageRequest {
    /// A message that only carries `content` and pings nobody.
    pub fn silent(content: impl Into<String>, nonce: u64) -> Self {
        Self {
            content: content.into(),
            nonce: nonce.to_string(),
            allowed_mentions: AllowedMentions::default(),
        }
    }
}

/// What the sticker feature needs from the host.
#[async_trait]
pub trait StickerHost: Send + Sync {
    /// The sendability the host computed before the override masked it.
    /// `None` when this host version does not expose it.
    fn real_sendability(&self, item: &StickerItem) -> Option<Sendability>;

    fn selected_channel(&self) -> Option<ChannelId>;

    async fn send_message(&self, channel: ChannelId, message: MessageRequest) -> FeatureResult<()>;

    /// Dismisses the picking UI owned by `picker`.
    fn close_picker(&self, picker: &HostValue) -> FeatureResult<()>;
}

/// What the animated media feature needs from the host.
pub trait MediaHost: Send + Sync {
    fn resource_id(&self, name: &str, kind: &str) -> Option<ResourceId>;

    /// The image view with `id` inside the view binding of `owner`.
    fn find_image_view(&self, owner: &HostValue, id: ResourceId) -> Option<Weak<dyn ImageTarget>>;

    /// The URL the full-media widget is about to display.
    fn formatted_media_url(&self, widget: &HostValue) -> Option<String>;
}

pub mod surface {
    use super::*;

    pub const STICKER_ITEM: &str = "StickerItem";
    pub const STICKER_PICKER: &str = "WidgetStickerPicker";
    pub const INLINE_MEDIA_VIEW: &str = "InlineMediaView";
    pub const WIDGET_MEDIA: &str = "WidgetMedia";

    pub fn sticker_sendability() -> MethodId {
        MethodId::new(STICKER_ITEM, "getSendability", &[])
    }

    pub fn sticker_selected() -> MethodId {
        MethodId::new(STICKER_PICKER, "onStickerItemSelected", &[STICKER_ITEM])
    }

    pub fn inline_media_update() -> MethodId {
        MethodId::new(
            INLINE_MEDIA_VIEW,
            "updateUI",
            &["RenderableEmbedMedia", "String", "EmbedType", "Integer", "Integer", "String"],
        )
    }

    pub fn media_image_configured() -> MethodId {
        MethodId::new(WIDGET_MEDIA, "configureMediaImage", &[])
    }

    /// Table of every method the features attach to, with their return kinds.
    pub fn method_table() -> MethodTable {
        MethodTable::new()
            .with(sticker_sendability(), ValueKind::Object)
            .with(sticker_selected(), ValueKind::Void)
            .with(inline_media_update(), ValueKind::Void)
            .with(media_image_configured(), ValueKind::Void)
    }
}
