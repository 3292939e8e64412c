use hookline_core::HookError;
use thiserror::Error;

/// Errors of the fetch-decode-dispatch pipeline.
/// None of them leaves the pipeline: they end as a log line and a failure event.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Network error fetching '{url}': {message}")]
    NetworkError {
        url: String,
        message: String,
    },

    #[error("Decode error for '{url}': {message}")]
    DecodeError {
        url: String,
        message: String,
    },

    /// The fetcher or the decoder panicked on the worker
    #[error("Load of '{url}' panicked: {message}")]
    WorkerPanic {
        url: String,
        message: String,
    },

    #[error(transparent)]
    Hook(#[from] HookError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn worker_panic(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerPanic {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeError {
            url: url.into(),
            message: message.into(),
        }
    }
}

// Macro for creating network errors
#[macro_export]
macro_rules! network_error {
    ($url:expr, $msg:expr) => {
        Err($crate::error::PipelineError::network($url, $msg))
    };
    ($url:expr, $fmt:expr, $($arg:tt)*) => {
        Err($crate::error::PipelineError::network($url, format!($fmt, $($arg)*)))
    };
}

// Macro for creating decode errors
#[macro_export]
macro_rules! decode_error {
    ($url:expr, $msg:expr) => {
        Err($crate::error::PipelineError::decode($url, $msg))
    };
    ($url:expr, $fmt:expr, $($arg:tt)*) => {
        Err($crate::error::PipelineError::decode($url, format!($fmt, $($arg)*)))
    };
}
