use std::any::Any;
use std::fmt;
use std::sync::Arc;
use derive_more::Display;
use crate::error::{HookError, HookResult};

/// A type-erased, shared host object (a message, a view binding, a sticker item...).
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl HostObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn same_object(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject<{}>", self.type_name)
    }
}

/// Dynamically typed argument, receiver or result of an intercepted call.
#[derive(Debug, Clone, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(HostObject),
}

impl HostValue {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(HostObject::new(value))
    }

    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Object(HostObject::shared(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Void,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Object(_) => ValueKind::Object,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Object(object) => object.type_name(),
            other => other.kind().name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Shared handle to the wrapped host object, if it has type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Object(object) => object.downcast::<T>(),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Self::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.same_object(b),
            _ => false,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl TryFrom<HostValue> for bool {
    type Error = HookError;
    fn try_from(value: HostValue) -> HookResult<bool> {
        match value {
            HostValue::Bool(b) => Ok(b),
            other => Err(HookError::type_error("bool", other.type_name())),
        }
    }
}

impl TryFrom<HostValue> for i64 {
    type Error = HookError;
    fn try_from(value: HostValue) -> HookResult<i64> {
        match value {
            HostValue::Int(i) => Ok(i),
            other => Err(HookError::type_error("int", other.type_name())),
        }
    }
}

impl TryFrom<HostValue> for String {
    type Error = HookError;
    fn try_from(value: HostValue) -> HookResult<String> {
        match value {
            HostValue::Str(s) => Ok(s),
            other => Err(HookError::type_error("string", other.type_name())),
        }
    }
}

/// Declared type of a parameter or of a method's return value.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    #[display("void")]
    Void,
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("string")]
    Str,
    #[display("object")]
    Object,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Object => "object",
        }
    }

    /// The value handed back to the host when nothing committed a result.
    pub fn empty_value(&self) -> HostValue {
        match self {
            Self::Void | Self::Object => HostValue::Null,
            Self::Bool => HostValue::Bool(false),
            Self::Int => HostValue::Int(0),
            Self::Float => HostValue::Float(0.0),
            Self::Str => HostValue::Str(String::new()),
        }
    }
}
