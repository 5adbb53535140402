//! End-to-end extension route generation.
//!
//! Runs once per session while the host builds its route table, before menu
//! and access generation, so extension routes go through the same role
//! filtering as static ones.

use std::sync::Arc;

use crate::config::ExtensionConfig;
use crate::error::Result;
use crate::fetcher::DescriptorFetcher;
use crate::mount::{IntegrationOutcome, MountIntegrator, RouteRecord};
use crate::order::order_routes;
use crate::resolver::{ComponentRegistry, InMemoryComponentRegistry, UnitResolver};
use crate::synth::{AliasCollision, ResolvedRoute, RouteSynthesizer};

/// Summary of one generation pass.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub descriptors: usize,
    pub routes: usize,
    pub collisions: Vec<AliasCollision>,
    pub outcome: IntegrationOutcome,
}

/// Fetcher, synthesizer and integrator wired together.
#[derive(Clone)]
pub struct ExtensionPipeline {
    fetcher: DescriptorFetcher,
    synthesizer: RouteSynthesizer,
    integrator: MountIntegrator,
}

impl ExtensionPipeline {
    pub fn new(
        fetcher: DescriptorFetcher,
        synthesizer: RouteSynthesizer,
        integrator: MountIntegrator,
    ) -> Self {
        Self {
            fetcher,
            synthesizer,
            integrator,
        }
    }

    /// HTTP registry, HTTP module loader and an empty component registry.
    pub fn from_config(config: &ExtensionConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(InMemoryComponentRegistry::new()))
    }

    /// HTTP registry and module loader with a host-provided component registry.
    pub fn with_registry(
        config: &ExtensionConfig,
        registry: Arc<dyn ComponentRegistry>,
    ) -> Result<Self> {
        let fetcher = DescriptorFetcher::from_config(config)?;
        let resolver = UnitResolver::from_config(config, registry)?;
        Ok(Self::new(
            fetcher,
            RouteSynthesizer::from_config(resolver, config),
            MountIntegrator::from_config(config),
        ))
    }

    pub fn fetcher(&self) -> &DescriptorFetcher {
        &self.fetcher
    }

    pub fn synthesizer(&self) -> &RouteSynthesizer {
        &self.synthesizer
    }

    /// Fetch, synthesize and order extension routes.
    pub async fn load_routes(&self) -> (Vec<ResolvedRoute>, Vec<AliasCollision>, usize) {
        self.load_routes_for(&[]).await
    }

    /// Fetch, synthesize and order extension routes whose aliases must not
    /// shadow anything in `host_routes`.
    pub async fn load_routes_for(
        &self,
        host_routes: &[RouteRecord],
    ) -> (Vec<ResolvedRoute>, Vec<AliasCollision>, usize) {
        let descriptors = self.fetcher.fetch_all().await;
        let count = descriptors.len();
        if descriptors.is_empty() {
            return (Vec::new(), Vec::new(), 0);
        }

        let batch = self
            .synthesizer
            .synthesize_batch_for_host(descriptors, host_routes);
        (order_routes(batch.routes), batch.collisions, count)
    }

    /// Load extension routes and mount them into `host_routes`.
    pub async fn generate(&self, host_routes: &mut [RouteRecord]) -> PipelineReport {
        let (routes, collisions, descriptors) = self.load_routes_for(host_routes).await;
        let route_count = routes.len();
        let outcome = self.integrator.integrate(host_routes, routes);

        tracing::info!(
            "Extension routes: {} descriptors, {} routes, {} alias collisions",
            descriptors,
            route_count,
            collisions.len()
        );

        PipelineReport {
            descriptors,
            routes: route_count,
            collisions,
            outcome,
        }
    }
}
