use std::sync::{Arc, Mutex, PoisonError};
use hookline_core::{Interceptor, InterceptorHandle, InterceptorRegistry, MethodId};
use crate::error::{FeatureError, FeatureResult};

/// A unit of host behavior installed as a group of interceptors.
pub trait Feature: Send + Sync {
    /// Nome della feature
    fn name(&self) -> &str;

    /// Descrizione per debug/help
    fn description(&self) -> &str;

    /// Disabled features are skipped by [`FeatureManager::start`].
    fn is_enabled(&self) -> bool {
        true
    }

    /// Attaches the feature's interceptors. On error nothing stays attached.
    fn install(self: Arc<Self>, registry: &InterceptorRegistry) -> FeatureResult<Vec<InterceptorHandle>>;
}

/// Attaches every pair in order, detaching the earlier ones if a later one fails.
pub fn attach_all(
    registry: &InterceptorRegistry,
    interceptors: Vec<(MethodId, Interceptor)>,
) -> FeatureResult<Vec<InterceptorHandle>> {
    let mut handles = Vec::with_capacity(interceptors.len());
    for (method, interceptor) in interceptors {
        match registry.attach(&method, interceptor) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in &handles {
                    registry.detach(handle);
                }
                return Err(e.into());
            }
        }
    }
    Ok(handles)
}

struct Installed {
    name: String,
    handles: Vec<InterceptorHandle>,
}

/// Manager delle feature: start/stop del plugin
pub struct FeatureManager {
    registry: Arc<InterceptorRegistry>,
    features: Vec<Arc<dyn Feature>>,
    installed: Mutex<Vec<Installed>>,
}

impl FeatureManager {
    pub fn new(registry: Arc<InterceptorRegistry>) -> Self {
        Self {
            registry,
            features: Vec::new(),
            installed: Mutex::new(Vec::new()),
        }
    }

    /// Features are installed in registration order.
    pub fn register(&mut self, feature: Arc<dyn Feature>) -> FeatureResult<()> {
        if self.features.iter().any(|it| it.name() == feature.name()) {
            return Err(FeatureError::DuplicateFeature { name: feature.name().to_string() });
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn registry(&self) -> &Arc<InterceptorRegistry> {
        &self.registry
    }

    /// Installs every enabled feature. The first failure rolls back the features
    /// already installed and is returned to the caller.
    pub fn start(&self) -> FeatureResult<()> {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if !installed.is_empty() {
            log::warn!("Features already started, ignoring start");
            return Ok(());
        }

        for feature in &self.features {
            if !feature.is_enabled() {
                log::info!("Feature '{}' disabled, skipping", feature.name());
                continue;
            }

            match feature.clone().install(&self.registry) {
                Ok(handles) => {
                    log::info!("Feature '{}' installed ({} interceptors)", feature.name(), handles.len());
                    installed.push(Installed { name: feature.name().to_string(), handles });
                }
                Err(e) => {
                    log::error!("Could not install feature '{}': {}", feature.name(), e);
                    for previous in installed.drain(..) {
                        for handle in &previous.handles {
                            self.registry.detach(handle);
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Detaches everything the registry holds.
    pub fn stop(&self) {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        self.registry.detach_all();
        installed.clear();
        log::info!("Features stopped");
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|it| it.name.clone())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        !self.installed.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}
