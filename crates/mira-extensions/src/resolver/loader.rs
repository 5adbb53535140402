//! Module loaders for remote extension units.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::unit::{mount_id_for, Component, DynComponent, StaticComponent};
use crate::config::ExtensionConfig;
use crate::error::{ExtensionError, Result};
use crate::render::{RenderInstruction, RenderNode};

/// Capability to bring remote extension code into the host.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Inject a module script and wait until it has loaded.
    async fn inject_script(&self, url: &str) -> Result<()>;

    /// Import a module from an absolute URL.
    async fn import_module(&self, url: &str) -> Result<DynComponent>;
}

/// Loader that checks module availability over HTTP.
///
/// The host page executes the script; this loader only confirms it can be
/// retrieved and hands back a component that mounts it.
pub struct HttpModuleLoader {
    client: reqwest::Client,
}

impl HttpModuleLoader {
    pub fn new(config: &ExtensionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ExtensionError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtensionError::module_load(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtensionError::module_load(
                url,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleLoader for HttpModuleLoader {
    async fn inject_script(&self, url: &str) -> Result<()> {
        self.fetch(url).await?;
        tracing::debug!("Injected extension script {}", url);
        Ok(())
    }

    async fn import_module(&self, url: &str) -> Result<DynComponent> {
        self.fetch(url).await?;
        Ok(Arc::new(RemoteModule {
            url: url.to_string(),
        }))
    }
}

/// Module imported from an absolute URL.
#[derive(Debug, Clone)]
pub struct RemoteModule {
    pub url: String,
}

impl Component for RemoteModule {
    fn name(&self) -> &str {
        &self.url
    }

    fn render(&self) -> RenderInstruction {
        RenderNode::element("div")
            .attr("class", "ext-module")
            .child(RenderNode::element("div").attr("id", mount_id_for(&self.url)))
            .child(
                RenderNode::element("script")
                    .attr("type", "module")
                    .attr("src", self.url.clone()),
            )
            .into()
    }
}

/// Loader that performs no I/O and records what was requested.
#[derive(Default)]
pub struct RecordingModuleLoader {
    injected: Mutex<Vec<String>>,
    imported: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    modules: Mutex<HashMap<String, DynComponent>>,
    delay: Option<Duration>,
}

impl RecordingModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make requests for `url` fail.
    pub fn fail_on(&self, url: impl Into<String>) {
        self.failing.lock().insert(url.into());
    }

    /// Stop failing requests for `url`.
    pub fn recover(&self, url: &str) {
        self.failing.lock().remove(url);
    }

    /// Serve `component` for imports of `url`.
    pub fn with_module(self, url: impl Into<String>, component: DynComponent) -> Self {
        self.modules.lock().insert(url.into(), component);
        self
    }

    /// Every `inject_script` request, in order.
    pub fn injected(&self) -> Vec<String> {
        self.injected.lock().clone()
    }

    /// Every `import_module` request, in order.
    pub fn imported(&self) -> Vec<String> {
        self.imported.lock().clone()
    }

    pub fn inject_count(&self, url: &str) -> usize {
        self.injected.lock().iter().filter(|u| *u == url).count()
    }

    async fn settle(&self, url: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(url) {
            return Err(ExtensionError::module_load(url, format!("Failed to load {}", url)));
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleLoader for RecordingModuleLoader {
    async fn inject_script(&self, url: &str) -> Result<()> {
        self.injected.lock().push(url.to_string());
        self.settle(url).await
    }

    async fn import_module(&self, url: &str) -> Result<DynComponent> {
        self.imported.lock().push(url.to_string());
        self.settle(url).await?;
        let registered = self.modules.lock().get(url).cloned();
        Ok(registered.unwrap_or_else(|| {
            StaticComponent::shared(url, RenderNode::element("div").attr("data-module", url))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_loader_records_requests() {
        let loader = RecordingModuleLoader::new();
        loader.inject_script("http://a/x.js").await.unwrap();
        loader.inject_script("http://a/x.js").await.unwrap();
        let module = loader.import_module("http://a/m.js").await.unwrap();

        assert_eq!(loader.inject_count("http://a/x.js"), 2);
        assert_eq!(loader.imported(), vec!["http://a/m.js"]);
        assert_eq!(module.name(), "http://a/m.js");
    }

    #[tokio::test]
    async fn test_recording_loader_failures() {
        let loader = RecordingModuleLoader::new();
        loader.fail_on("http://a/bad.js");
        let err = loader.inject_script("http://a/bad.js").await.unwrap_err();
        assert!(matches!(err, ExtensionError::ModuleLoad { .. }));

        loader.recover("http://a/bad.js");
        assert!(loader.inject_script("http://a/bad.js").await.is_ok());
    }

    #[test]
    fn test_remote_module_render() {
        let module = RemoteModule {
            url: "https://cdn.example.com/ext/app.js".to_string(),
        };
        let html = module.render().to_html();
        assert!(html.contains("type=\"module\""));
        assert!(html.contains("src=\"https://cdn.example.com/ext/app.js\""));
    }
}
