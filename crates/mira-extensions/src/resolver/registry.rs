//! Component lookup and the injected-script registry.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};

use super::loader::ModuleLoader;
use super::unit::{DynComponent, InitHook};
use crate::error::Result;

/// Registry that loaded extension scripts publish their components into.
pub trait ComponentRegistry: Send + Sync {
    /// Component registered under `key`.
    fn lookup(&self, key: &str) -> Option<DynComponent>;

    /// Host hook for units that bootstrap themselves into a mount point.
    fn initialization_hook(&self) -> Option<InitHook> {
        None
    }
}

/// Key a script registers its component under:
/// `<owner>_<component path with '/' and '.' replaced by '_'>`.
pub fn registry_key(owner_name: &str, component_path: &str) -> String {
    format!("{}_{}", owner_name, component_path.replace(['/', '.'], "_"))
}

/// Thread-safe in-memory [`ComponentRegistry`].
#[derive(Default)]
pub struct InMemoryComponentRegistry {
    components: RwLock<HashMap<String, DynComponent>>,
    hook: RwLock<Option<InitHook>>,
}

impl InMemoryComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, replacing any previous one under the same key.
    pub fn register(&self, key: impl Into<String>, component: DynComponent) {
        self.components.write().insert(key.into(), component);
    }

    pub fn unregister(&self, key: &str) -> Option<DynComponent> {
        self.components.write().remove(key)
    }

    pub fn set_initialization_hook(&self, hook: InitHook) {
        *self.hook.write() = Some(hook);
    }

    pub fn clear_initialization_hook(&self) {
        *self.hook.write() = None;
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }
}

impl ComponentRegistry for InMemoryComponentRegistry {
    fn lookup(&self, key: &str) -> Option<DynComponent> {
        self.components.read().get(key).cloned()
    }

    fn initialization_hook(&self) -> Option<InitHook> {
        self.hook.read().clone()
    }
}

type ScriptLoad = Shared<BoxFuture<'static, Result<()>>>;

/// Session-wide record of injected script URLs.
///
/// Each URL is injected at most once. Callers arriving while an injection is
/// in flight await the same load. A failed load is forgotten so a later
/// navigation can retry it.
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: Mutex<HashMap<String, ScriptLoad>>,
}

static GLOBAL_SCRIPTS: once_cell::sync::Lazy<Arc<ScriptRegistry>> =
    once_cell::sync::Lazy::new(|| Arc::new(ScriptRegistry::new()));

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> Arc<ScriptRegistry> {
        Arc::clone(&GLOBAL_SCRIPTS)
    }

    /// Whether `url` has been injected or is being injected.
    pub fn contains(&self, url: &str) -> bool {
        self.scripts.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.scripts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.lock().is_empty()
    }

    /// Inject `url` through `loader` unless it already was, then await the load.
    pub async fn ensure_loaded(&self, url: &str, loader: Arc<dyn ModuleLoader>) -> Result<()> {
        let (load, injected_here) = {
            let mut scripts = self.scripts.lock();
            match scripts.get(url) {
                Some(load) => (load.clone(), false),
                None => {
                    let owned = url.to_string();
                    let load = async move { loader.inject_script(&owned).await }
                        .boxed()
                        .shared();
                    scripts.insert(url.to_string(), load.clone());
                    (load, true)
                }
            }
        };

        if !injected_here {
            tracing::debug!("Script already injected: {}", url);
        }

        let result = load.clone().await;
        if result.is_err() {
            let mut scripts = self.scripts.lock();
            if scripts.get(url).is_some_and(|current| current.ptr_eq(&load)) {
                scripts.remove(url);
            }
        }
        result
    }
}
