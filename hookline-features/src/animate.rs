use std::sync::{Arc, OnceLock};
use lazy_static::lazy_static;
use regex::Regex;
use hookline_core::{CallContext, HookResult, HostValue, Interceptor, InterceptorHandle, InterceptorRegistry};
use hookline_media::{FetchTask, ImagePipeline, MediaConfig};
use crate::config::AnimateConfig;
use crate::error::FeatureResult;
use crate::feature::{attach_all, Feature};
use crate::host::{surface, EmbedMedia, MediaHost, ResourceId};

lazy_static! {
    static ref QUERY_SIZE: Regex = Regex::new(r"[?&](width|height)=(\d+)").unwrap();
}

/// Width and height taken from the `width`/`height` query parameters.
pub fn query_size(url: &str) -> (Option<u32>, Option<u32>) {
    let mut size = (None, None);
    for captures in QUERY_SIZE.captures_iter(url) {
        let value = captures[2].parse().ok();
        match &captures[1] {
            "width" => size.0 = value,
            _ => size.1 = value,
        }
    }
    size
}

fn path_of(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Renders static-looking animated images through the image pipeline, both
/// inline in the chat and in the full screen media viewer.
pub struct AnimatedMediaFeature {
    host: Arc<dyn MediaHost>,
    pipeline: ImagePipeline,
    config: AnimateConfig,
    extension: String,
    inline_view: OnceLock<Option<ResourceId>>,
    media_view: OnceLock<Option<ResourceId>>,
}

impl AnimatedMediaFeature {
    pub fn new(
        host: Arc<dyn MediaHost>,
        pipeline: ImagePipeline,
        config: AnimateConfig,
        media: &MediaConfig,
    ) -> Self {
        Self {
            host,
            pipeline,
            config,
            extension: media.animated_extension.clone(),
            inline_view: OnceLock::new(),
            media_view: OnceLock::new(),
        }
    }

    /// Only the path counts: `a.png?width=1` qualifies, `a.png.mp4` does not.
    fn is_animated(&self, url: &str) -> bool {
        path_of(url).ends_with(self.extension.as_str())
    }

    /// Resolved on first use; a missing resource is remembered too.
    fn view_id(&self, cache: &OnceLock<Option<ResourceId>>, name: &str) -> Option<ResourceId> {
        *cache.get_or_init(|| {
            let id = self.host.resource_id(name, &self.config.resource_kind);
            if id.is_none() {
                log::warn!("Host exposes no {} resource named '{}'", self.config.resource_kind, name);
            }
            id
        })
    }

    fn load_into(&self, owner: &HostValue, view_id: ResourceId, url: &str, width: Option<u32>, height: Option<u32>) {
        let Some(view) = self.host.find_image_view(owner, view_id) else {
            log::debug!("No image view {} for {}", view_id, url);
            return;
        };
        let url = self.pipeline.canonicalizer().canonicalize(url).into_owned();
        self.pipeline.load(FetchTask::new(url, view).with_size(width, height));
    }

    fn on_inline_media(&self, context: &mut CallContext) -> HookResult<()> {
        let Some(media) = context.arg(0).and_then(|it| it.downcast::<EmbedMedia>()) else {
            return Ok(());
        };
        if !self.is_animated(&media.url) {
            return Ok(());
        }
        let Some(owner) = context.receiver() else {
            return Ok(());
        };
        let Some(view_id) = self.view_id(&self.inline_view, &self.config.inline_view_resource) else {
            return Ok(());
        };

        let (query_width, query_height) = query_size(&media.url);
        self.load_into(
            owner,
            view_id,
            &media.url,
            media.width.or(query_width),
            media.height.or(query_height),
        );
        Ok(())
    }

    fn on_media_configured(&self, context: &mut CallContext) -> HookResult<()> {
        let Some(widget) = context.receiver() else {
            return Ok(());
        };
        let Some(url) = self.host.formatted_media_url(widget) else {
            return Ok(());
        };
        if !self.is_animated(&url) {
            return Ok(());
        }
        let (width, height) = query_size(&url);

        let Some(view_id) = self.view_id(&self.media_view, &self.config.media_view_resource) else {
            return Ok(());
        };
        self.load_into(widget, view_id, &url, width, height);
        Ok(())
    }
}

impl Feature for AnimatedMediaFeature {
    fn name(&self) -> &str {
        "animated-media"
    }

    fn description(&self) -> &str {
        "Plays animated images in inline embeds and in the media viewer"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn install(self: Arc<Self>, registry: &InterceptorRegistry) -> FeatureResult<Vec<InterceptorHandle>> {
        let inline = self.clone();
        let full = self.clone();
        attach_all(registry, vec![
            (
                surface::inline_media_update(),
                Interceptor::after("animate-inline", move |context| inline.on_inline_media(context)),
            ),
            (
                surface::media_image_configured(),
                Interceptor::after("animate-media", move |context| full.on_media_configured(context)),
            ),
        ])
    }
}
