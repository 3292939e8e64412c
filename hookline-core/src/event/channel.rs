use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use crate::error::{HookError, HookResult};

/// Channel per comunicare eventi di intercettazione e del pipeline immagini
#[derive(Debug, Clone)]
pub struct InterceptionEventChannel {
    pub session_id: Arc<String>,
    pub sender: mpsc::UnboundedSender<InterceptionEvent>,
}

impl InterceptionEventChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InterceptionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4().to_string();

        (Self { session_id: Arc::new(session_id), sender }, receiver)
    }

    pub fn emit(&self, event: InterceptionEvent) -> HookResult<()> {
        self.sender.send(event)
            .map_err(|_| HookError::dispatch("Failed to send interception event"))
    }

    pub fn emit_with_context(&self, kind: InterceptionEventKind, metadata: HashMap<String, String>) -> HookResult<()> {
        let event = InterceptionEvent {
            id: Uuid::new_v4().to_string(),
            session_id: self.session_id.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            kind,
            metadata,
        };
        self.emit(event)
    }

    /// Best effort: a receiver that went away is not an error for the caller.
    pub fn notify(&self, kind: InterceptionEventKind) {
        if self.emit_with_context(kind, HashMap::new()).is_err() {
            log::trace!("interception event dropped, receiver closed");
        }
    }
}

/// Notifies through an optional channel.
pub fn notify(channel: &Option<InterceptionEventChannel>, kind: InterceptionEventKind) {
    if let Some(channel) = channel {
        channel.notify(kind);
    }
}

/// Eventi emessi durante l'intercettazione e il caricamento delle immagini
#[derive(Debug, Clone)]
pub struct InterceptionEvent {
    pub id: String,
    pub session_id: String,
    pub timestamp: u64,
    pub kind: InterceptionEventKind,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterceptionEventKind {
    // Registry Events
    InterceptorAttached {
        method: String,
        interceptor: String,
        position: usize,
    },
    InterceptorDetached {
        method: String,
        interceptor: String,
    },
    RegistryCleared {
        methods: usize,
    },
    CallVetoed {
        method: String,
        interceptor: String,
    },
    InterceptorFailed {
        method: String,
        interceptor: String,
        error: String,
    },

    // Image Pipeline Events
    ImageApplied {
        url: String,
    },
    ImageDiscarded {
        url: String,
    },
    ImageLoadFailed {
        url: String,
        error: String,
    },

    // Feature Events
    SendRerouted {
        channel_id: u64,
        nonce: String,
    },
    SendFailed {
        error: String,
    },
}

impl InterceptionEvent {
    pub fn is_error(&self) -> bool {
        matches!(self.kind,
            InterceptionEventKind::InterceptorFailed { .. } |
            InterceptionEventKind::ImageLoadFailed { .. } |
            InterceptionEventKind::SendFailed { .. }
        )
    }

    pub fn is_registry(&self) -> bool {
        matches!(self.kind,
            InterceptionEventKind::InterceptorAttached { .. } |
            InterceptionEventKind::InterceptorDetached { .. } |
            InterceptionEventKind::RegistryCleared { .. }
        )
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self.kind,
            InterceptionEventKind::ImageApplied { .. } |
            InterceptionEventKind::ImageDiscarded { .. } |
            InterceptionEventKind::ImageLoadFailed { .. }
        )
    }

    pub fn method(&self) -> Option<&str> {
        match &self.kind {
            InterceptionEventKind::InterceptorAttached { method, .. } => Some(method),
            InterceptionEventKind::InterceptorDetached { method, .. } => Some(method),
            InterceptionEventKind::CallVetoed { method, .. } => Some(method),
            InterceptionEventKind::InterceptorFailed { method, .. } => Some(method),
            _ => None,
        }
    }
}

// Utility per filtrare gli eventi
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub session_ids: Option<Vec<String>>,
    pub methods: Option<Vec<String>>,
    pub time_range: Option<(u64, u64)>,
    pub only_errors: bool,
    pub only_pipeline: bool,
}

impl EventFilter {
    pub fn matches(&self, event: &InterceptionEvent) -> bool {
        if let Some(ref ids) = self.session_ids {
            if !ids.contains(&event.session_id) {
                return false;
            }
        }

        if let Some(ref methods) = self.methods {
            match event.method() {
                Some(method) if methods.iter().any(|it| it == method) => {}
                _ => return false,
            }
        }

        if let Some((start, end)) = self.time_range {
            if event.timestamp < start || event.timestamp > end {
                return false;
            }
        }

        if self.only_errors && !event.is_error() {
            return false;
        }

        if self.only_pipeline && !event.is_pipeline() {
            return false;
        }

        true
    }
}
