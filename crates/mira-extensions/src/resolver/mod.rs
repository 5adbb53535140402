//! Unit resolution for extension routes.
//!
//! A descriptor's [`RenderSpec`] picks one strategy:
//!
//! - **Inline**: run the builder in a guarded scope. Errors and panics become an
//!   error panel.
//! - **Remote**: import absolute URLs directly. Relative component paths are
//!   resolved against the extension asset root, injected once per session, then
//!   looked up in the [`ComponentRegistry`]; scripts that registered nothing
//!   get a [`BridgeUnit`]. Load failures become a diagnostic panel.
//! - **Placeholder**: an informational panel.
//!
//! Resolution never fails and is deferred: [`UnitResolver::resolve`] returns a
//! [`LazyUnit`] that does the work on first load.

pub mod loader;
pub mod registry;
pub mod unit;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::OnceCell;
use url::Url;

use crate::config::{defaults, ExtensionConfig};
use crate::descriptor::{Builder, ExtensionDescriptor, RenderSpec};
use crate::error::{ExtensionError, Result};
use crate::render::RenderInstruction;

pub use loader::{HttpModuleLoader, ModuleLoader, RecordingModuleLoader, RemoteModule};
pub use registry::{registry_key, ComponentRegistry, InMemoryComponentRegistry, ScriptRegistry};
pub use unit::{
    BridgeUnit, Component, DynComponent, InitHook, LoadDiagnostic, MountPoint, Provenance,
    RenderUnit, StaticComponent,
};

/// Resolves descriptors into renderable units.
#[derive(Clone)]
pub struct UnitResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    extension_base_url: String,
    loader: Arc<dyn ModuleLoader>,
    registry: Arc<dyn ComponentRegistry>,
    scripts: Arc<ScriptRegistry>,
}

impl UnitResolver {
    pub fn new(
        extension_base_url: impl Into<String>,
        loader: Arc<dyn ModuleLoader>,
        registry: Arc<dyn ComponentRegistry>,
        scripts: Arc<ScriptRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                extension_base_url: crate::config::normalize_base_url(&extension_base_url.into()),
                loader,
                registry,
                scripts,
            }),
        }
    }

    /// HTTP loader, the given registry and the process-wide script registry.
    pub fn from_config(
        config: &ExtensionConfig,
        registry: Arc<dyn ComponentRegistry>,
    ) -> Result<Self> {
        let loader = Arc::new(HttpModuleLoader::new(config)?);
        Ok(Self::new(
            config.extension_base_url.clone(),
            loader,
            registry,
            ScriptRegistry::global(),
        ))
    }

    pub fn script_registry(&self) -> &Arc<ScriptRegistry> {
        &self.inner.scripts
    }

    /// Deferred unit for `descriptor`. Does no work until loaded.
    pub fn resolve(&self, descriptor: &ExtensionDescriptor) -> LazyUnit {
        LazyUnit {
            inner: Arc::new(LazyInner {
                resolver: self.clone(),
                descriptor: descriptor.clone(),
                unit: OnceCell::new(),
            }),
        }
    }

    /// Resolve `descriptor` immediately.
    pub async fn resolve_now(&self, descriptor: &ExtensionDescriptor) -> RenderUnit {
        match &descriptor.render {
            RenderSpec::InlineGenerated(builder) => run_builder(&descriptor.name, builder),
            RenderSpec::RemoteCompiled { component } => {
                self.resolve_remote(descriptor, component).await
            }
            RenderSpec::Placeholder => RenderUnit::Placeholder {
                name: descriptor.name.clone(),
                title: descriptor.display_title().to_string(),
                path: descriptor.path.clone(),
            },
        }
    }

    /// `<base>/<collection|default>/<owner|unknown>/<component>`.
    pub fn component_url(&self, descriptor: &ExtensionDescriptor, component: &str) -> String {
        let provenance = provenance_of(descriptor, component);
        format!(
            "{}/{}/{}/{}",
            self.inner.extension_base_url,
            provenance.collection_id,
            provenance.owner_name,
            component.trim_start_matches('/')
        )
    }

    async fn resolve_remote(&self, descriptor: &ExtensionDescriptor, component: &str) -> RenderUnit {
        let provenance = provenance_of(descriptor, component);

        if is_absolute_url(component) {
            return match self.inner.loader.import_module(component).await {
                Ok(module) => RenderUnit::Compiled(module),
                Err(e) => {
                    tracing::error!("Failed to import extension module {}: {}", component, e);
                    RenderUnit::LoadError(LoadDiagnostic {
                        name: descriptor.name.clone(),
                        url: component.to_string(),
                        provenance,
                        error: e.detail(),
                    })
                }
            };
        }

        let url = self.component_url(descriptor, component);
        if let Err(e) = self
            .inner
            .scripts
            .ensure_loaded(&url, Arc::clone(&self.inner.loader))
            .await
        {
            tracing::error!("Failed to load extension script {}: {}", url, e);
            return RenderUnit::LoadError(LoadDiagnostic {
                name: descriptor.name.clone(),
                url,
                provenance,
                error: e.detail(),
            });
        }

        let key = registry_key(&provenance.owner_name, component);
        match self.inner.registry.lookup(&key) {
            Some(registered) => {
                tracing::debug!("Using registered component {} for {}", key, descriptor.name);
                RenderUnit::Compiled(registered)
            }
            None => {
                tracing::debug!(
                    "No component registered under {}, bridging {}",
                    key,
                    descriptor.name
                );
                RenderUnit::Bridge(BridgeUnit::new(
                    descriptor.name.clone(),
                    descriptor.display_title().to_string(),
                    provenance,
                    Arc::clone(&self.inner.registry),
                ))
            }
        }
    }
}

fn provenance_of(descriptor: &ExtensionDescriptor, component: &str) -> Provenance {
    Provenance {
        owner_name: descriptor
            .owner_name
            .clone()
            .unwrap_or_else(|| defaults::OWNER_NAME.to_string()),
        collection_id: descriptor
            .collection_id
            .clone()
            .unwrap_or_else(|| defaults::COLLECTION_ID.to_string()),
        component_path: component.to_string(),
    }
}

/// `http`/`https` URLs are imported directly; anything else is an asset path.
pub fn is_absolute_url(component: &str) -> bool {
    Url::parse(component)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn run_builder(name: &str, builder: &Builder) -> RenderUnit {
    match guarded_build(builder) {
        Ok(instruction) => RenderUnit::Inline {
            name: name.to_string(),
            instruction,
        },
        Err(e) => {
            tracing::error!("Error executing builder for extension route {}: {}", name, e);
            RenderUnit::InlineError {
                name: name.to_string(),
                message: e.detail(),
            }
        }
    }
}

/// Run `builder`, turning both errors and panics into [`ExtensionError::Builder`].
fn guarded_build(builder: &Builder) -> Result<RenderInstruction> {
    match panic::catch_unwind(AssertUnwindSafe(|| builder.build())) {
        Ok(Ok(instruction)) => Ok(instruction),
        Ok(Err(e)) => Err(ExtensionError::Builder(e.to_string())),
        Err(payload) => Err(ExtensionError::Builder(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "builder panicked".to_string()
    }
}

/// A unit resolved on first load and cached afterwards.
#[derive(Clone)]
pub struct LazyUnit {
    inner: Arc<LazyInner>,
}

struct LazyInner {
    resolver: UnitResolver,
    descriptor: ExtensionDescriptor,
    unit: OnceCell<RenderUnit>,
}

impl LazyUnit {
    /// Resolve the unit, or return the cached one.
    pub async fn load(&self) -> RenderUnit {
        self.inner
            .unit
            .get_or_init(|| self.inner.resolver.resolve_now(&self.inner.descriptor))
            .await
            .clone()
    }

    /// The unit, if it has been loaded.
    pub fn get(&self) -> Option<&RenderUnit> {
        self.inner.unit.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.unit.initialized()
    }

    /// Name of the descriptor this unit renders.
    pub fn descriptor_name(&self) -> &str {
        &self.inner.descriptor.name
    }

    /// Strategy the unit will use.
    pub fn strategy(&self) -> &'static str {
        self.inner.descriptor.render.kind()
    }
}

impl fmt::Debug for LazyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyUnit")
            .field("descriptor", &self.inner.descriptor.name)
            .field("strategy", &self.strategy())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
