use std::fmt;
use std::sync::Arc;
use crate::error::HookResult;
use crate::interceptor::context::CallContext;
use crate::types::HostValue;

pub mod context;
pub mod registry;

/// Body of a `Before` interceptor or of one phase of an `Around` interceptor.
pub type HookFn = dyn Fn(&mut CallContext) -> HookResult<()> + Send + Sync;

/// Interceptor that wraps the original call, with a phase ahead of it and one after it.
pub trait AroundHook: Send + Sync {
    /// Nome dell'interceptor
    fn name(&self) -> &str;

    /// Runs with the `Before` interceptors. May replace arguments, commit a result or veto.
    fn before(&self, _context: &mut CallContext) -> HookResult<()> {
        Ok(())
    }

    /// Runs once the result is known. May observe or replace it.
    fn after(&self, _context: &mut CallContext) -> HookResult<()> {
        Ok(())
    }
}

/// Enum unificato per i tre modi di intercettazione
#[derive(Clone)]
pub enum Interceptor {
    /// Runs ahead of the original; committing a result short-circuits the call.
    Before {
        name: Arc<str>,
        hook: Arc<HookFn>,
    },
    /// Always replaces the result with a fixed value and skips the original body.
    InsteadConstant(HostValue),
    /// Wraps the original call.
    Around(Arc<dyn AroundHook>),
}

impl Interceptor {
    pub fn before<F>(name: impl Into<Arc<str>>, hook: F) -> Self
    where
        F: Fn(&mut CallContext) -> HookResult<()> + Send + Sync + 'static,
    {
        Self::Before {
            name: name.into(),
            hook: Arc::new(hook),
        }
    }

    pub fn instead_constant(value: impl Into<HostValue>) -> Self {
        Self::InsteadConstant(value.into())
    }

    /// An `Around` interceptor that only has a post phase.
    pub fn after<F>(name: impl Into<Arc<str>>, hook: F) -> Self
    where
        F: Fn(&mut CallContext) -> HookResult<()> + Send + Sync + 'static,
    {
        Self::Around(Arc::new(FnAroundHook {
            name: name.into(),
            before: None,
            after: Some(Arc::new(hook) as Arc<HookFn>),
        }))
    }

    pub fn around<B, A>(name: impl Into<Arc<str>>, before: B, after: A) -> Self
    where
        B: Fn(&mut CallContext) -> HookResult<()> + Send + Sync + 'static,
        A: Fn(&mut CallContext) -> HookResult<()> + Send + Sync + 'static,
    {
        Self::Around(Arc::new(FnAroundHook {
            name: name.into(),
            before: Some(Arc::new(before) as Arc<HookFn>),
            after: Some(Arc::new(after) as Arc<HookFn>),
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Before { name, .. } => &**name,
            Self::InsteadConstant(_) => "instead-constant",
            Self::Around(hook) => hook.name(),
        }
    }

    pub fn interceptor_type(&self) -> &'static str {
        match self {
            Self::Before { .. } => "before",
            Self::InsteadConstant(_) => "instead",
            Self::Around(_) => "around",
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsteadConstant(value) => f.debug_tuple("InsteadConstant").field(value).finish(),
            other => write!(f, "{}({})", other.interceptor_type(), other.name()),
        }
    }
}

struct FnAroundHook {
    name: Arc<str>,
    before: Option<Arc<HookFn>>,
    after: Option<Arc<HookFn>>,
}

impl AroundHook for FnAroundHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn before(&self, context: &mut CallContext) -> HookResult<()> {
        match &self.before {
            Some(hook) => hook(context),
            None => Ok(()),
        }
    }

    fn after(&self, context: &mut CallContext) -> HookResult<()> {
        match &self.after {
            Some(hook) => hook(context),
            None => Ok(()),
        }
    }
}
