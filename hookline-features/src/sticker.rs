use std::sync::Arc;
use hookline_core::event::channel::{notify, InterceptionEventChannel, InterceptionEventKind};
use hookline_core::executor::BackgroundPool;
use hookline_core::{CallContext, HookResult, HostValue, Interceptor, InterceptorHandle, InterceptorRegistry};
use crate::config::StickerConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::feature::{attach_all, Feature};
use crate::host::{surface, MessageRequest, Sendability, Sticker, StickerHost, StickerItem};
use crate::nonce::NonceGenerator;

/// Lets every sticker be picked and sends the ones the account could not
/// send natively as a plain link to the sticker image.
pub struct StickerSendFeature {
    host: Arc<dyn StickerHost>,
    pool: Arc<dyn BackgroundPool>,
    config: StickerConfig,
    nonces: NonceGenerator,
    events: Option<InterceptionEventChannel>,
}

impl StickerSendFeature {
    pub fn new(host: Arc<dyn StickerHost>, pool: Arc<dyn BackgroundPool>, config: StickerConfig) -> Self {
        Self {
            host,
            pool,
            config,
            nonces: NonceGenerator::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: InterceptionEventChannel) -> Self {
        self.events = Some(events);
        self
    }

    pub fn sticker_url(&self, sticker: &Sticker) -> String {
        format!(
            "{}{}{}?size={}",
            self.config.url_base, sticker.id, sticker.format_extension, self.config.preview_size
        )
    }

    fn on_sticker_selected(&self, context: &mut CallContext) -> HookResult<()> {
        if let Err(e) = self.reroute(context) {
            log::error!("Sticker reroute failed, leaving the picker to the host: {}", e);
            notify(&self.events, InterceptionEventKind::SendFailed { error: e.to_string() });
        }
        Ok(())
    }

    fn reroute(&self, context: &mut CallContext) -> FeatureResult<()> {
        let item = context.arg_as::<StickerItem>(0)?;

        let Some(real) = self.host.real_sendability(&item) else {
            log::warn!("Real sendability of sticker {} unavailable, not rerouting", item.sticker.id);
            return Ok(());
        };
        if real == Sendability::Sendable {
            return Ok(());
        }

        let channel = self.host.selected_channel()
            .ok_or_else(|| FeatureError::send("no channel selected"))?;
        let message = MessageRequest::silent(self.sticker_url(&item.sticker), self.nonces.next());
        log::debug!("Rerouting sticker {} to channel {} as {:?}", item.sticker.id, channel, message);

        let host = self.host.clone();
        let events = self.events.clone();
        let nonce = message.nonce.clone();
        self.pool.spawn(Box::pin(async move {
            match host.send_message(channel, message).await {
                Ok(()) => notify(&events, InterceptionEventKind::SendRerouted { channel_id: channel, nonce }),
                Err(e) => {
                    log::error!("Sticker send to channel {} failed: {}", channel, e);
                    notify(&events, InterceptionEventKind::SendFailed { error: e.to_string() });
                }
            }
        }))?;

        context.set_result(HostValue::Null);
        if let Some(picker) = context.receiver() {
            if let Err(e) = self.host.close_picker(picker) {
                log::error!("Could not close the sticker picker: {}", e);
            }
        }
        Ok(())
    }
}

impl Feature for StickerSendFeature {
    fn name(&self) -> &str {
        "sticker-send"
    }

    fn description(&self) -> &str {
        "Marks every sticker sendable and sends locked ones as links"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn install(self: Arc<Self>, registry: &InterceptorRegistry) -> FeatureResult<Vec<InterceptorHandle>> {
        let feature = self.clone();
        attach_all(registry, vec![
            (
                surface::sticker_sendability(),
                Interceptor::instead_constant(HostValue::object(Sendability::Sendable)),
            ),
            (
                surface::sticker_selected(),
                Interceptor::before("sticker-reroute", move |context| feature.on_sticker_selected(context)),
            ),
        ])
    }
}
