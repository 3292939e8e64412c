use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use hookline_core::event::channel::{notify, InterceptionEventChannel, InterceptionEventKind};
use hookline_core::executor::{BackgroundPool, UiDispatcher};
use crate::canonical::UrlCanonicalizer;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{AnimatedImage, AnimationDecoder, FetchTask, StreamFetcher};

/// External collaborators the pipeline runs on.
pub struct PipelineParts {
    pub fetcher: Arc<dyn StreamFetcher>,
    pub decoder: Arc<dyn AnimationDecoder>,
    pub pool: Arc<dyn BackgroundPool>,
    pub ui: Arc<dyn UiDispatcher>,
}

struct PipelineInner {
    canonicalizer: UrlCanonicalizer,
    fetcher: Arc<dyn StreamFetcher>,
    decoder: Arc<dyn AnimationDecoder>,
    pool: Arc<dyn BackgroundPool>,
    ui: Arc<dyn UiDispatcher>,
    events: Option<InterceptionEventChannel>,
}

/// Fetch -> decode -> dispatch-to-UI, fire and forget.
///
/// Every load is independent: no caching, no de-duplication, no retry. Failures end
/// the load silently (the host keeps its static rendering) and a target that died
/// while the work was in flight receives nothing.
#[derive(Clone)]
pub struct ImagePipeline {
    inner: Arc<PipelineInner>,
}

impl ImagePipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                canonicalizer: UrlCanonicalizer::default(),
                fetcher: parts.fetcher,
                decoder: parts.decoder,
                pool: parts.pool,
                ui: parts.ui,
                events: None,
            }),
        }
    }

    pub fn with_canonicalizer(self, canonicalizer: UrlCanonicalizer) -> Self {
        self.map_inner(|inner| inner.canonicalizer = canonicalizer)
    }

    pub fn with_events(self, events: InterceptionEventChannel) -> Self {
        self.map_inner(|inner| inner.events = Some(events))
    }

    fn map_inner(self, apply: impl FnOnce(&mut PipelineInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => PipelineInner {
                canonicalizer: shared.canonicalizer.clone(),
                fetcher: shared.fetcher.clone(),
                decoder: shared.decoder.clone(),
                pool: shared.pool.clone(),
                ui: shared.ui.clone(),
                events: shared.events.clone(),
            },
        };
        apply(&mut inner);
        Self { inner: Arc::new(inner) }
    }

    pub fn canonicalizer(&self) -> &UrlCanonicalizer {
        &self.inner.canonicalizer
    }

    /// Schedules the load on the background pool and returns immediately.
    pub fn load(&self, task: FetchTask) {
        let url = self.inner.canonicalizer.canonicalize(&task.url).into_owned();
        log::debug!("Scheduling animated load of {}", url);

        let inner = self.inner.clone();
        let submitted = self.inner.pool.submit(Box::new(move || {
            inner.fetch_and_dispatch(url, task);
        }));
        if let Err(e) = submitted {
            log::warn!("Animated load not scheduled: {}", e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<&str>()
        .map(|it| it.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl PipelineInner {
    fn fetch_and_dispatch(self: &Arc<Self>, url: String, task: FetchTask) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.fetch_and_decode(&url, task.width, task.height)
        }))
        .unwrap_or_else(|payload| Err(PipelineError::worker_panic(&url, panic_message(payload.as_ref()))));

        match outcome {
            Ok(animation) => self.dispatch(url, animation, task),
            Err(e) => {
                // Best effort: niente retry, la view resta con il frame statico
                log::debug!("Animated load failed: {}", e);
                notify(&self.events, InterceptionEventKind::ImageLoadFailed {
                    url,
                    error: e.to_string(),
                });
            }
        }
    }

    fn fetch_and_decode(
        &self,
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> PipelineResult<Arc<dyn AnimatedImage>> {
        // No format sniffing first: the stream can only be consumed once.
        let mut stream = self.fetcher.fetch(url)?;
        self.decoder.decode(url, &mut stream, width, height)
    }

    fn dispatch(self: &Arc<Self>, url: String, animation: Arc<dyn AnimatedImage>, task: FetchTask) {
        let inner = self.clone();
        let posted = self.ui.post(Box::new(move || {
            match task.live_target() {
                Some(view) => {
                    view.set_animation(animation.clone());
                    animation.start();
                    log::trace!("Animated image applied: {}", url);
                    notify(&inner.events, InterceptionEventKind::ImageApplied { url });
                }
                None => {
                    drop(animation);
                    log::trace!("Target gone, animated image discarded: {}", url);
                    notify(&inner.events, InterceptionEventKind::ImageDiscarded { url });
                }
            }
        }));
        if let Err(e) = posted {
            log::warn!("Decoded animation dropped, UI dispatch failed: {}", e);
        }
    }
}
