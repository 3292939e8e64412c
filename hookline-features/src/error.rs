use hookline_core::HookError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The reroute could not build or submit its send request
    #[error("Send error: {message}")]
    SendError {
        message: String,
    },

    /// A feature with the same name is already registered
    #[error("Feature '{name}' is already registered")]
    DuplicateFeature {
        name: String,
    },
}

pub type FeatureResult<T> = Result<T, FeatureError>;

impl FeatureError {
    pub fn send(message: impl Into<String>) -> Self {
        Self::SendError {
            message: message.into(),
        }
    }

    /// Attach-time resolution failures must stop the startup sequence.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Hook(error) if error.is_fatal())
    }
}
