use std::any::Any;
use std::sync::Arc;
use crate::error::{HookError, HookResult};
use crate::types::HostValue;

/// Which part of the invocation protocol is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPhase {
    #[default]
    Before,
    Original,
    After,
}

/// Per-invocation state handed to every interceptor: receiver, arguments,
/// the result slot and the veto flag. Created for one call and discarded after it.
#[derive(Debug, Default)]
pub struct CallContext {
    receiver: Option<HostValue>,
    args: Vec<HostValue>,
    result: Option<HostValue>,
    vetoed: bool,
    phase: CallPhase,
}

impl CallContext {
    pub fn new(receiver: HostValue, args: Vec<HostValue>) -> Self {
        Self {
            receiver: Some(receiver),
            args,
            ..Self::default()
        }
    }

    /// Context for a type-level (static) method: there is no receiver.
    pub fn for_static(args: Vec<HostValue>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn receiver(&self) -> Option<&HostValue> {
        self.receiver.as_ref()
    }

    pub fn receiver_as<T: Any + Send + Sync>(&self) -> HookResult<Arc<T>> {
        let receiver = self.receiver.as_ref()
            .ok_or_else(|| HookError::execution("static call has no receiver"))?;
        receiver.downcast::<T>()
            .ok_or_else(|| HookError::type_error(std::any::type_name::<T>(), receiver.type_name()))
    }

    pub fn args(&self) -> &[HostValue] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&HostValue> {
        self.args.get(index)
    }

    /// Typed access to an object argument.
    pub fn arg_as<T: Any + Send + Sync>(&self, index: usize) -> HookResult<Arc<T>> {
        let arg = self.args.get(index)
            .ok_or_else(|| HookError::execution(format!("argument {} out of range", index)))?;
        arg.downcast::<T>()
            .ok_or_else(|| HookError::type_error(std::any::type_name::<T>(), arg.type_name()))
    }

    /// Replaces an argument. The arity is fixed by the method signature.
    pub fn set_arg(&mut self, index: usize, value: impl Into<HostValue>) -> HookResult<()> {
        let arity = self.args.len();
        let slot = self.args.get_mut(index)
            .ok_or_else(|| HookError::execution(format!("argument {} out of range (arity {})", index, arity)))?;
        *slot = value.into();
        Ok(())
    }

    pub fn result(&self) -> Option<&HostValue> {
        self.result.as_ref()
    }

    /// Commits a result. Ahead of the original this also vetoes it.
    pub fn set_result(&mut self, value: impl Into<HostValue>) {
        self.result = Some(value.into());
        if self.phase == CallPhase::Before {
            self.vetoed = true;
        }
    }

    /// Skips the original body without committing a value.
    pub fn veto(&mut self) {
        if self.phase == CallPhase::Before {
            self.vetoed = true;
        }
    }

    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub(crate) fn enter(&mut self, phase: CallPhase) {
        self.phase = phase;
    }

    pub(crate) fn commit_original(&mut self, value: HostValue) {
        self.result = Some(value);
    }

    pub(crate) fn take_result(&mut self) -> Option<HostValue> {
        self.result.take()
    }
}
