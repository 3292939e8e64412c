use std::io::Read;
use std::sync::{Arc, Weak};
use crate::error::PipelineResult;

pub mod loader;

/// Opens a streamed fetch of a URL. Always called on the background pool.
pub trait StreamFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> PipelineResult<Box<dyn Read + Send>>;
}

/// Decodes a fetched stream into a renderable animation.
/// The size hints are advisory only.
pub trait AnimationDecoder: Send + Sync {
    fn decode(
        &self,
        url: &str,
        stream: &mut dyn Read,
        width: Option<u32>,
        height: Option<u32>,
    ) -> PipelineResult<Arc<dyn AnimatedImage>>;
}

/// Decoded, independently lifecycled animation (a drawable, in host terms).
pub trait AnimatedImage: Send + Sync {
    /// Starts playback. Called on the UI thread, after the image is attached.
    fn start(&self);
}

/// View that displays a decoded animation. Touched on the UI thread only.
pub trait ImageTarget: Send + Sync {
    fn set_animation(&self, animation: Arc<dyn AnimatedImage>);

    /// A view can be detached from its window while still allocated.
    fn is_alive(&self) -> bool {
        true
    }
}

/// One animated-image load: what to fetch and where the result goes.
/// The target is held weakly; the pipeline never keeps a view alive.
#[derive(Clone)]
pub struct FetchTask {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub target: Weak<dyn ImageTarget>,
}

impl FetchTask {
    pub fn new(url: impl Into<String>, target: Weak<dyn ImageTarget>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            target,
        }
    }

    pub fn for_target<T: ImageTarget + 'static>(url: impl Into<String>, target: &Arc<T>) -> Self {
        let target = Arc::downgrade(target) as Weak<dyn ImageTarget>;
        Self::new(url, target)
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// The live target, if it is still usable.
    pub fn live_target(&self) -> Option<Arc<dyn ImageTarget>> {
        self.target.upgrade().filter(|it| it.is_alive())
    }
}

impl std::fmt::Debug for FetchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTask")
            .field("url", &self.url)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("target_alive", &(self.target.strong_count() > 0))
            .finish()
    }
}
