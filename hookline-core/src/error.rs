use thiserror::Error;

/// Main error type for interception operations
#[derive(Debug, Clone, Error)]
pub enum HookError {
    /// The host does not expose the requested method. Raised at attach time only.
    #[error("Resolution error: cannot bind '{method}': {reason}")]
    ResolutionError {
        method: String,
        reason: String,
    },

    /// An interceptor failed (returned an error or panicked) while running.
    #[error("Interceptor error: '{interceptor}' failed on '{method}': {message}")]
    InterceptorError {
        interceptor: String,
        method: String,
        message: String,
    },

    /// Runtime errors raised from inside interceptor bodies
    #[error("Execution error: {message}")]
    ExecutionError {
        message: String,
    },

    /// Value conversion errors on arguments and results
    #[error("Type error: expected {expected}, found {found}")]
    TypeError {
        expected: String,
        found: String,
    },

    /// A pool or UI dispatcher refused the job (usually after shutdown)
    #[error("Dispatch error: {message}")]
    DispatchError {
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },
}

/// Result type alias for interception operations
pub type HookResult<T> = Result<T, HookError>;

impl HookError {
    /// Create a resolution error
    pub fn resolution(method: impl ToString, reason: impl Into<String>) -> Self {
        Self::ResolutionError {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an interceptor error
    pub fn interceptor(
        interceptor: impl Into<String>,
        method: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::InterceptorError {
            interceptor: interceptor.into(),
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeError {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::DispatchError {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Only resolution errors may cross into the host's startup code.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResolutionError { .. })
    }
}

impl From<String> for HookError {
    fn from(error: String) -> Self {
        Self::execution(error)
    }
}

impl<'a> From<&'a str> for HookError {
    fn from(error: &'a str) -> Self {
        Self::execution(error)
    }
}

impl From<serde_json::Error> for HookError {
    fn from(error: serde_json::Error) -> Self {
        Self::config(format!("JSON error: {}", error))
    }
}

// Macro for creating execution errors
#[macro_export]
macro_rules! hook_error {
    ($msg:expr) => {
        Err($crate::error::HookError::execution($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::error::HookError::execution(format!($fmt, $($arg)*)))
    };
}

// Macro for creating resolution errors
#[macro_export]
macro_rules! resolution_error {
    ($method:expr, $msg:expr) => {
        Err($crate::error::HookError::resolution($method, $msg))
    };
    ($method:expr, $fmt:expr, $($arg:tt)*) => {
        Err($crate::error::HookError::resolution($method, format!($fmt, $($arg)*)))
    };
}
