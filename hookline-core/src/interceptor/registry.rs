use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use crate::error::{HookError, HookResult};
use crate::event::channel::{notify, InterceptionEventChannel, InterceptionEventKind};
use crate::interceptor::Interceptor;
use crate::interceptor::context::{CallContext, CallPhase};
use crate::method::{MethodId, MethodResolver, ResolvedMethod};
use crate::types::{HostValue, ValueKind};

/// Returned by [`InterceptorRegistry::attach`], identifies one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterceptorHandle {
    method: MethodId,
    id: u64,
}

impl InterceptorHandle {
    pub fn method(&self) -> &MethodId {
        &self.method
    }
}

#[derive(Clone)]
struct AttachedInterceptor {
    id: u64,
    interceptor: Interceptor,
}

/// Interceptors of one method, in attachment order.
/// The list is never mutated in place: writers publish a new `Arc`, so a reader
/// holding a snapshot keeps a consistent view for the whole invocation.
#[derive(Clone)]
struct InterceptionSet {
    returns: ValueKind,
    interceptors: Arc<[AttachedInterceptor]>,
}

/// Registry that maps host methods to their interceptors and runs the invocation protocol.
pub struct InterceptorRegistry {
    resolver: Arc<dyn MethodResolver>,
    sets: RwLock<HashMap<MethodId, InterceptionSet>>,
    next_id: AtomicU64,
    events: Option<InterceptionEventChannel>,
}

impl InterceptorRegistry {
    pub fn new(resolver: Arc<dyn MethodResolver>) -> Self {
        Self {
            resolver,
            sets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events: None,
        }
    }

    pub fn with_events(mut self, events: InterceptionEventChannel) -> Self {
        self.events = Some(events);
        self
    }

    /// Appends `interceptor` to the method's set.
    /// Fails with [`HookError::ResolutionError`] if the host does not expose `method`.
    pub fn attach(&self, method: &MethodId, interceptor: Interceptor) -> HookResult<InterceptorHandle> {
        let ResolvedMethod { id, returns } = self.resolver.resolve(method)?;
        let handle_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = interceptor.name().to_string();
        let kind = interceptor.interceptor_type();

        let position = {
            let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
            let set = sets.entry(id.clone()).or_insert_with(|| InterceptionSet {
                returns,
                interceptors: Arc::from(Vec::new()),
            });
            let attached = AttachedInterceptor { id: handle_id, interceptor };
            set.interceptors = set.interceptors.iter()
                .cloned()
                .chain(std::iter::once(attached))
                .collect();
            set.interceptors.len() - 1
        };

        log::debug!("Attached {} interceptor '{}' to {} at position {}", kind, name, id, position);
        notify(&self.events, InterceptionEventKind::InterceptorAttached {
            method: id.to_string(),
            interceptor: name,
            position,
        });

        Ok(InterceptorHandle { method: id, id: handle_id })
    }

    /// Removes exactly the interceptor behind `handle`.
    /// Returns `false` (and changes nothing) when it was already detached.
    pub fn detach(&self, handle: &InterceptorHandle) -> bool {
        let removed = {
            let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
            let Some(set) = sets.get_mut(&handle.method) else {
                return false;
            };
            let Some(removed) = set.interceptors.iter().find(|it| it.id == handle.id).cloned() else {
                return false;
            };
            set.interceptors = set.interceptors.iter()
                .filter(|it| it.id != handle.id)
                .cloned()
                .collect();
            if set.interceptors.is_empty() {
                sets.remove(&handle.method);
            }
            removed
        };

        log::debug!("Detached interceptor '{}' from {}", removed.interceptor.name(), handle.method);
        notify(&self.events, InterceptionEventKind::InterceptorDetached {
            method: handle.method.to_string(),
            interceptor: removed.interceptor.name().to_string(),
        });
        true
    }

    /// Clears every interception set. Invocations already running finish with
    /// the snapshot they started with; later invocations see no interceptor.
    pub fn detach_all(&self) {
        let methods = {
            let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
            let count = sets.len();
            sets.clear();
            count
        };
        log::info!("Detached all interceptors from {} methods", methods);
        notify(&self.events, InterceptionEventKind::RegistryCleared { methods });
    }

    pub fn interceptor_count(&self, method: &MethodId) -> usize {
        self.snapshot(method)
            .map(|set| set.interceptors.len())
            .unwrap_or(0)
    }

    pub fn patched_methods(&self) -> Vec<MethodId> {
        self.sets.read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn snapshot(&self, method: &MethodId) -> Option<InterceptionSet> {
        self.sets.read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()
    }

    /// Runs one real call of `method` through its interceptors.
    ///
    /// 1. `Before`, `InsteadConstant` and `Around` pre phases run in attachment order
    ///    until one of them vetoes the call.
    /// 2. If nothing vetoed, `original` runs and its value becomes the result.
    /// 3. Every `Around` post phase runs in attachment order against the current result.
    /// 4. The committed result is returned, or the empty value of the return type.
    ///
    /// A failing interceptor is logged and never propagates. A failure ahead of the
    /// original skips the remaining pre phases and the original body; a failure
    /// in a post phase skips the remaining post phases.
    pub fn invoke<F>(&self, method: &MethodId, mut context: CallContext, original: F) -> HostValue
    where
        F: FnOnce(&CallContext) -> HostValue,
    {
        let Some(set) = self.snapshot(method) else {
            return original(&context);
        };

        if context.args().len() != method.arity() {
            log::error!(
                "Call to {} with {} arguments, signature expects {}; interceptors skipped",
                method, context.args().len(), method.arity()
            );
            return original(&context);
        }

        context.enter(CallPhase::Before);
        let mut aborted = false;
        for attached in set.interceptors.iter() {
            let outcome = match &attached.interceptor {
                Interceptor::InsteadConstant(value) => {
                    context.set_result(value.clone());
                    Ok(())
                }
                Interceptor::Before { hook, .. } => Self::guarded(|| hook(&mut context)),
                Interceptor::Around(hook) => Self::guarded(|| hook.before(&mut context)),
            };

            if let Err(message) = outcome {
                self.report_failure(method, &attached.interceptor, message);
                aborted = true;
                break;
            }

            if context.is_vetoed() {
                log::trace!("{} vetoed by '{}'", method, attached.interceptor.name());
                notify(&self.events, InterceptionEventKind::CallVetoed {
                    method: method.to_string(),
                    interceptor: attached.interceptor.name().to_string(),
                });
                break;
            }
        }

        if !aborted && !context.is_vetoed() {
            context.enter(CallPhase::Original);
            let value = original(&context);
            context.commit_original(value);
        }

        context.enter(CallPhase::After);
        for attached in set.interceptors.iter() {
            let Interceptor::Around(hook) = &attached.interceptor else {
                continue;
            };
            if let Err(message) = Self::guarded(|| hook.after(&mut context)) {
                self.report_failure(method, &attached.interceptor, message);
                break;
            }
        }

        context.take_result().unwrap_or_else(|| set.returns.empty_value())
    }

    /// Runs one interceptor phase, turning both errors and panics into a message.
    fn guarded<F>(phase: F) -> Result<(), String>
    where
        F: FnOnce() -> HookResult<()>,
    {
        match panic::catch_unwind(AssertUnwindSafe(phase)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error.to_string()),
            Err(payload) => Err(Self::panic_message(payload.as_ref())),
        }
    }

    fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
        if let Some(message) = payload.downcast_ref::<&str>() {
            format!("panicked: {}", message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            format!("panicked: {}", message)
        } else {
            "panicked".to_string()
        }
    }

    fn report_failure(&self, method: &MethodId, interceptor: &Interceptor, message: String) {
        let error = HookError::interceptor(interceptor.name(), method, message);
        log::error!("{}", error);
        notify(&self.events, InterceptionEventKind::InterceptorFailed {
            method: method.to_string(),
            interceptor: interceptor.name().to_string(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use crate::method::MethodTable;
    use super::*;

    fn method() -> MethodId {
        MethodId::new("Picker", "onSelected", &["Item"])
    }

    fn registry() -> InterceptorRegistry {
        let table = MethodTable::new()
            .with(method(), ValueKind::Str)
            .with(MethodId::new("Item", "getSendability", &[]), ValueKind::Object);
        InterceptorRegistry::new(Arc::new(table))
    }

    fn call(registry: &InterceptorRegistry, ran: &AtomicUsize) -> HostValue {
        registry.invoke(
            &method(),
            CallContext::new(HostValue::Null, vec![HostValue::from("item")]),
            |_| {
                ran.fetch_add(1, Ordering::SeqCst);
                HostValue::from("original")
            },
        )
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Interceptor {
        let log = log.clone();
        let tag = tag.to_string();
        Interceptor::before(tag.clone(), move |_| {
            log.lock().unwrap().push(tag.clone());
            Ok(())
        })
    }

    #[test]
    fn unpatched_methods_run_the_original() {
        let registry = registry();
        let ran = AtomicUsize::new(0);
        assert_eq!(call(&registry, &ran), HostValue::from("original"));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn attach_fails_for_unknown_methods() {
        let registry = registry();
        let err = registry.attach(&MethodId::new("Picker", "onSelected", &[]), Interceptor::instead_constant(1)).unwrap_err();
        assert!(matches!(err, HookError::ResolutionError { .. }));
        assert!(registry.patched_methods().is_empty());
    }

    #[test]
    fn before_interceptors_run_in_attachment_order() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c", "d"] {
            registry.attach(&method(), recorder(&log, tag)).unwrap();
        }
        let ran = AtomicUsize::new(0);
        assert_eq!(call(&registry, &ran), HostValue::from("original"));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn veto_stops_later_interceptors_and_the_original() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.attach(&method(), recorder(&log, "first")).unwrap();
        registry.attach(&method(), Interceptor::before("veto", |ctx| {
            ctx.set_result("short-circuit");
            Ok(())
        })).unwrap();
        registry.attach(&method(), recorder(&log, "never")).unwrap();

        let ran = AtomicUsize::new(0);
        assert_eq!(call(&registry, &ran), HostValue::from("short-circuit"));
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn instead_constant_replaces_the_result() {
        let registry = registry();
        let id = MethodId::new("Item", "getSendability", &[]);
        registry.attach(&id, Interceptor::instead_constant("SENDABLE")).unwrap();

        let ran = AtomicUsize::new(0);
        let result = registry.invoke(&id, CallContext::new(HostValue::Null, vec![]), |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            HostValue::from("NONSENDABLE")
        });
        assert_eq!(result, HostValue::from("SENDABLE"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn around_post_sees_and_replaces_an_instead_constant() {
        let registry = registry();
        let id = MethodId::new("Item", "getSendability", &[]);
        registry.attach(&id, Interceptor::instead_constant("SENDABLE")).unwrap();
        registry.attach(&id, Interceptor::after("observe", |ctx| {
            assert_eq!(ctx.phase(), CallPhase::After);
            assert!(ctx.is_vetoed());
            let seen = ctx.result().and_then(|it| it.as_str()).unwrap_or_default().to_string();
            ctx.set_result(format!("{}+seen", seen));
            Ok(())
        })).unwrap();

        let ran = AtomicUsize::new(0);
        let result = registry.invoke(&id, CallContext::new(HostValue::Null, vec![]), |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            HostValue::from("NONSENDABLE")
        });
        assert_eq!(result, HostValue::from("SENDABLE+seen"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn vetoing_around_runs_its_post_and_skips_later_befores() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let before_log = log.clone();
        let after_log = log.clone();
        registry.attach(&method(), Interceptor::around(
            "gate",
            move |ctx| {
                assert_eq!(ctx.phase(), CallPhase::Before);
                before_log.lock().unwrap().push("gate-before".to_string());
                ctx.set_result("gated");
                Ok(())
            },
            move |ctx| {
                assert_eq!(ctx.result(), Some(&HostValue::from("gated")));
                after_log.lock().unwrap().push("gate-after".to_string());
                Ok(())
            },
        )).unwrap();
        registry.attach(&method(), recorder(&log, "late")).unwrap();

        let ran = AtomicUsize::new(0);
        assert_eq!(call(&registry, &ran), HostValue::from("gated"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["gate-before", "gate-after"]);
    }

    #[test]
    fn around_sees_original_result_and_may_replace_it() {
        let registry = registry();
        registry.attach(&method(), Interceptor::around(
            "wrap",
            |ctx| ctx.set_arg(0, "rewritten"),
            |ctx| {
                let seen = ctx.result().and_then(|it| it.as_str()).unwrap_or_default().to_string();
                ctx.set_result(format!("{}+after", seen));
                Ok(())
            },
        )).unwrap();

        let result = registry.invoke(
            &method(),
            CallContext::new(HostValue::Null, vec![HostValue::from("item")]),
            |ctx| ctx.arg(0).cloned().unwrap_or_default(),
        );
        assert_eq!(result, HostValue::from("rewritten+after"));
    }

    #[test]
    fn failing_before_still_lets_later_around_post_run() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.attach(&method(), Interceptor::before("broken", |_| Err("boom".into()))).unwrap();
        registry.attach(&method(), recorder(&log, "skipped")).unwrap();
        let post_log = log.clone();
        registry.attach(&method(), Interceptor::after("post", move |ctx| {
            post_log.lock().unwrap().push(format!("post:{:?}", ctx.result()));
            Ok(())
        })).unwrap();

        let ran = AtomicUsize::new(0);
        // nothing was committed, so the empty string of the return type comes back
        assert_eq!(call(&registry, &ran), HostValue::from(""));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["post:None".to_string()]);
    }

    #[test]
    fn panicking_interceptor_is_contained() {
        let registry = registry();
        registry.attach(&method(), Interceptor::after("panics", |_| panic!("bad hook"))).unwrap();
        let ran = AtomicUsize::new(0);
        assert_eq!(call(&registry, &ran), HostValue::from("original"));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_is_idempotent_and_targets_one_interceptor() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = registry.attach(&method(), recorder(&log, "first")).unwrap();
        registry.attach(&method(), recorder(&log, "second")).unwrap();

        assert!(registry.detach(&first));
        assert!(!registry.detach(&first));
        assert_eq!(registry.interceptor_count(&method()), 1);

        let ran = AtomicUsize::new(0);
        call(&registry, &ran);
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn detach_all_clears_every_set() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = registry.attach(&method(), recorder(&log, "gone")).unwrap();
        registry.attach(&MethodId::new("Item", "getSendability", &[]), Interceptor::instead_constant(1)).unwrap();

        registry.detach_all();
        assert!(registry.patched_methods().is_empty());
        assert!(!registry.detach(&handle));

        let ran = AtomicUsize::new(0);
        call(&registry, &ran);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn in_flight_invocation_keeps_its_snapshot() {
        let registry = Arc::new(registry());
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = registry.clone();
        registry.attach(&method(), Interceptor::before("clears", move |_| {
            inner.detach_all();
            Ok(())
        })).unwrap();
        registry.attach(&method(), recorder(&log, "still-runs")).unwrap();

        let ran = AtomicUsize::new(0);
        call(&registry, &ran);
        assert_eq!(*log.lock().unwrap(), vec!["still-runs"]);

        call(&registry, &ran);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_attach_both_run_once() {
        let registry = Arc::new(registry());
        let hits = Arc::new(AtomicUsize::new(0));
        let workers = (0..2)
            .map(|i| {
                let registry = registry.clone();
                let hits = hits.clone();
                std::thread::spawn(move || {
                    registry.attach(&method(), Interceptor::before(format!("t{}", i), move |_| {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }))
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        let ran = AtomicUsize::new(0);
        call(&registry, &ran);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(registry.interceptor_count(&method()), 2);
    }

    #[test]
    fn events_report_attach_veto_and_failure() {
        let (channel, mut receiver) = InterceptionEventChannel::new();
        let registry = registry().with_events(channel);
        registry.attach(&method(), Interceptor::before("broken", |_| Err("boom".into()))).unwrap();
        let ran = AtomicUsize::new(0);
        call(&registry, &ran);

        let kinds = std::iter::from_fn(|| receiver.try_recv().ok())
            .map(|it| it.kind)
            .collect::<Vec<_>>();
        assert!(matches!(kinds[0], InterceptionEventKind::InterceptorAttached { position: 0, .. }));
        assert!(matches!(&kinds[1], InterceptionEventKind::InterceptorFailed { interceptor, .. } if interceptor == "broken"));
    }
}
