use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use hookline_core::event::InterceptionEvent;
use hookline_core::event::channel::{InterceptionEventChannel, InterceptionEventKind};
use hookline_core::executor::TokioPool;
use hookline_core::{CallContext, HostValue, InterceptorRegistry};
use hookline_features::host::{surface, ChannelId, MessageRequest, Sendability, Sticker, StickerHost, StickerItem};
use hookline_features::{Feature, FeatureError, FeatureManager, FeatureResult, StickerConfig, StickerSendFeature};
use tokio::sync::mpsc::UnboundedReceiver;

struct Picker;

#[derive(Default)]
struct FakeStickerHost {
    real: HashMap<u64, Sendability>,
    channel: Option<ChannelId>,
    fail_send: bool,
    sent: Mutex<Vec<(ChannelId, MessageRequest)>>,
    closed: AtomicUsize,
}

#[async_trait]
impl StickerHost for FakeStickerHost {
    fn real_sendability(&self, item: &StickerItem) -> Option<Sendability> {
        self.real.get(&item.sticker.id).copied()
    }

    fn selected_channel(&self) -> Option<ChannelId> {
        self.channel
    }

    async fn send_message(&self, channel: ChannelId, message: MessageRequest) -> FeatureResult<()> {
        if self.fail_send {
            return Err(FeatureError::send("HTTP 403"));
        }
        self.sent.lock().unwrap().push((channel, message));
        Ok(())
    }

    fn close_picker(&self, picker: &HostValue) -> FeatureResult<()> {
        assert!(picker.downcast_ref::<Picker>().is_some());
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn item(id: u64) -> StickerItem {
    StickerItem {
        sticker: Sticker { id, format_extension: ".png".to_string() },
    }
}

struct Harness {
    registry: Arc<InterceptorRegistry>,
    host: Arc<FakeStickerHost>,
    events: UnboundedReceiver<InterceptionEvent>,
    manager: FeatureManager,
}

fn harness(host: FakeStickerHost) -> Harness {
    let host = Arc::new(host);
    let registry = Arc::new(InterceptorRegistry::new(Arc::new(surface::method_table())));
    let (channel, events) = InterceptionEventChannel::new();
    let feature = StickerSendFeature::new(
        host.clone(),
        Arc::new(TokioPool::current(2).unwrap()),
        StickerConfig::default(),
    ).with_events(channel);

    let mut manager = FeatureManager::new(registry.clone());
    manager.register(Arc::new(feature)).unwrap();
    manager.start().unwrap();
    Harness { registry, host, events, manager }
}

/// Runs the picker's selection handler, returning how often the host body ran.
fn select(registry: &InterceptorRegistry, sticker: StickerItem) -> usize {
    let ran = AtomicUsize::new(0);
    registry.invoke(
        &surface::sticker_selected(),
        CallContext::new(HostValue::object(Picker), vec![HostValue::object(sticker)]),
        |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            HostValue::Null
        },
    );
    ran.load(Ordering::SeqCst)
}

async fn next_event(events: &mut UnboundedReceiver<InterceptionEvent>) -> InterceptionEventKind {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
        .kind
}

#[tokio::test(flavor = "multi_thread")]
async fn every_sticker_reports_sendable() {
    let harness = harness(FakeStickerHost::default());
    let result = harness.registry.invoke(
        &surface::sticker_sendability(),
        CallContext::new(HostValue::object(item(1)), vec![]),
        |_| HostValue::object(Sendability::NonSendable),
    );
    assert_eq!(result.downcast_ref::<Sendability>(), Some(&Sendability::Sendable));
}

#[tokio::test(flavor = "multi_thread")]
async fn locked_sticker_is_sent_as_a_link() {
    let mut harness = harness(FakeStickerHost {
        real: HashMap::from([(42, Sendability::SendableWithPremium)]),
        channel: Some(811255667469582420),
        ..FakeStickerHost::default()
    });

    assert_eq!(select(&harness.registry, item(42)), 0);
    assert_eq!(harness.host.closed.load(Ordering::SeqCst), 1);

    match next_event(&mut harness.events).await {
        InterceptionEventKind::SendRerouted { channel_id, .. } => assert_eq!(channel_id, 811255667469582420),
        other => panic!("unexpected event {:?}", other),
    }
    let sent = harness.host.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let (channel, message) = &sent[0];
    assert_eq!(*channel, 811255667469582420);
    assert_eq!(message.content, "https://media.discordapp.net/stickers/42.png?size=160");
    assert!(!message.allowed_mentions.replied_user);
    assert!(message.nonce.parse::<u64>().is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn consecutive_sends_use_distinct_nonces() {
    let mut harness = harness(FakeStickerHost {
        real: HashMap::from([(7, Sendability::NonSendable)]),
        channel: Some(1),
        ..FakeStickerHost::default()
    });

    for _ in 0..3 {
        select(&harness.registry, item(7));
    }
    for _ in 0..3 {
        assert!(matches!(next_event(&mut harness.events).await, InterceptionEventKind::SendRerouted { .. }));
    }
    let mut nonces = harness.host.sent.lock().unwrap()
        .iter()
        .map(|(_, message)| message.nonce.clone())
        .collect::<Vec<_>>();
    nonces.sort();
    nonces.dedup();
    assert_eq!(nonces.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn natively_sendable_sticker_goes_through_the_host() {
    let harness = harness(FakeStickerHost {
        real: HashMap::from([(42, Sendability::Sendable)]),
        channel: Some(1),
        ..FakeStickerHost::default()
    });

    assert_eq!(select(&harness.registry, item(42)), 1);
    assert_eq!(harness.host.closed.load(Ordering::SeqCst), 0);
    assert!(harness.host.sent.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_real_sendability_leaves_the_host_alone() {
    let harness = harness(FakeStickerHost { channel: Some(1), ..FakeStickerHost::default() });

    assert_eq!(select(&harness.registry, item(99)), 1);
    assert_eq!(harness.host.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_channel_keeps_the_picker_open() {
    let mut harness = harness(FakeStickerHost {
        real: HashMap::from([(42, Sendability::NonSendable)]),
        ..FakeStickerHost::default()
    });

    assert_eq!(select(&harness.registry, item(42)), 1);
    assert_eq!(harness.host.closed.load(Ordering::SeqCst), 0);
    match next_event(&mut harness.events).await {
        InterceptionEventKind::SendFailed { error } => assert!(error.contains("no channel selected")),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_send_is_reported() {
    let mut harness = harness(FakeStickerHost {
        real: HashMap::from([(42, Sendability::NonSendable)]),
        channel: Some(1),
        fail_send: true,
        ..FakeStickerHost::default()
    });

    assert_eq!(select(&harness.registry, item(42)), 0);
    match next_event(&mut harness.events).await {
        InterceptionEventKind::SendFailed { error } => assert!(error.contains("HTTP 403")),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_restores_host_behavior() {
    let harness = harness(FakeStickerHost {
        real: HashMap::from([(42, Sendability::NonSendable)]),
        channel: Some(1),
        ..FakeStickerHost::default()
    });
    harness.manager.stop();

    assert_eq!(select(&harness.registry, item(42)), 1);
    let result = harness.registry.invoke(
        &surface::sticker_sendability(),
        CallContext::new(HostValue::object(item(42)), vec![]),
        |_| HostValue::object(Sendability::NonSendable),
    );
    assert_eq!(result.downcast_ref::<Sendability>(), Some(&Sendability::NonSendable));
}

#[test]
fn disabled_feature_attaches_nothing() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pool = TokioPool::new(runtime.handle().clone(), 1);
    let registry = Arc::new(InterceptorRegistry::new(Arc::new(surface::method_table())));
    let config = StickerConfig { enabled: false, ..StickerConfig::default() };
    let feature = StickerSendFeature::new(Arc::new(FakeStickerHost::default()), Arc::new(pool), config);
    assert!(!feature.is_enabled());

    let mut manager = FeatureManager::new(registry.clone());
    manager.register(Arc::new(feature)).unwrap();
    manager.start().unwrap();
    assert!(registry.patched_methods().is_empty());
}
