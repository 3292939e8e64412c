pub mod types;
pub mod error;
pub mod method;
pub mod interceptor;
pub mod event;
pub mod executor;

pub use error::{HookError, HookResult};
pub use interceptor::Interceptor;
pub use interceptor::context::CallContext;
pub use interceptor::registry::{InterceptorHandle, InterceptorRegistry};
pub use method::{MethodId, MethodResolver, MethodTable, ResolvedMethod};
pub use types::{HostValue, ValueKind};
